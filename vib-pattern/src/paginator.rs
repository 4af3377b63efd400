//! Paginação de conjuntos HE 2.0 em pacotes de até 10 padrões
//!
//! Cada pacote é um payload HE 2.0 completo com o índice global do seu
//! primeiro padrão; o receptor remonta o conjunto apenas pela ordem dos índices.

use tracing::debug;
use vib_core::{CompiledPattern, HapticError, HapticResult, SenderId};

use crate::codec::{PacketHeader, PlaybackOptions, decode_he2_packet, encode_he2_packet};
use crate::model::{HeVersion, Pattern, PatternSet};

/// Máximo de padrões por pacote
pub const PACKET_PATTERN_CAP: usize = 10;

/// Divide o conjunto em pacotes ordenados
///
/// Todos os pacotes carregam o mesmo `SenderId` e a duração do conjunto inteiro.
pub fn paginate(
    set: &PatternSet,
    sender: SenderId,
    options: &PlaybackOptions,
    transient_tail_ms: u64,
) -> Vec<CompiledPattern> {
    let total = set.len().min(u16::MAX as usize) as u16;
    let single_play_ms = set.playback_duration_ms(transient_tail_ms);

    let packets: Vec<CompiledPattern> = set
        .patterns
        .chunks(PACKET_PATTERN_CAP)
        .enumerate()
        .map(|(chunk, patterns)| {
            let header = PacketHeader {
                he_version: HeVersion::V2,
                sender,
                total_patterns: total,
                packet_patterns: patterns.len() as u16,
            };
            let first_index = (chunk * PACKET_PATTERN_CAP) as u32;
            options.compile(encode_he2_packet(&header, first_index, patterns), single_play_ms)
        })
        .collect();

    debug!("paginated {} patterns into {} packets for sender {}", total, packets.len(), sender);
    packets
}

/// Remonta o conjunto a partir de pacotes em qualquer ordem
///
/// Falha com `OrderingViolation` se houver índices repetidos, faltando,
/// ou pacotes de remetentes diferentes.
pub fn reassemble<'a, I>(packets: I) -> HapticResult<(SenderId, PatternSet)>
where
    I: IntoIterator<Item = &'a [i32]>,
{
    let mut sender: Option<SenderId> = None;
    let mut total: Option<u16> = None;
    let mut indexed: Vec<(u32, Pattern)> = Vec::new();

    for words in packets {
        let packet = decode_he2_packet(words)?;
        match sender {
            Some(existing) if existing != packet.header.sender => {
                return Err(HapticError::OrderingViolation(format!(
                    "packet from {} mixed into transmission {}",
                    packet.header.sender, existing
                )));
            }
            _ => sender = Some(packet.header.sender),
        }
        match total {
            Some(expected) if expected != packet.header.total_patterns => {
                return Err(HapticError::MalformedStructure(format!(
                    "packet announces {} patterns, transmission announced {}",
                    packet.header.total_patterns, expected
                )));
            }
            _ => total = Some(packet.header.total_patterns),
        }
        indexed.extend(packet.patterns);
    }

    let sender = sender.ok_or_else(|| HapticError::MalformedStructure("no packets".into()))?;
    let total = total.map_or(0, usize::from);
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != total {
        return Err(HapticError::OrderingViolation(format!(
            "expected {} patterns, got {}",
            total,
            indexed.len()
        )));
    }
    for (expected, (index, _)) in indexed.iter().enumerate() {
        if *index as usize != expected {
            return Err(HapticError::OrderingViolation(format!(
                "pattern index {} where {} was expected",
                index, expected
            )));
        }
    }
    Ok((sender, PatternSet::new(indexed.into_iter().map(|(_, pattern)| pattern).collect())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, EventHeader};

    fn set_of(n: usize) -> PatternSet {
        PatternSet::new(
            (0..n)
                .map(|i| {
                    let header = EventHeader { channel: 0, relative_time_ms: 0, intensity: 10, frequency: 20 };
                    Pattern::new((i * 100) as i32, vec![Event::Transient(header)])
                })
                .collect(),
        )
    }

    #[test]
    fn test_small_set_single_packet() {
        let packets = paginate(&set_of(3), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].first_pattern_index(), Some(0));
        assert_eq!(packets[0].data[4], 3 | (3 << 16));
    }

    #[test]
    fn test_exactly_cap_is_one_packet() {
        let packets = paginate(&set_of(10), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn test_reassemble_rejects_gap() {
        let packets = paginate(&set_of(25), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        let partial = [packets[0].data.as_slice(), packets[2].data.as_slice()];
        assert!(matches!(reassemble(partial), Err(HapticError::OrderingViolation(_))));
    }

    #[test]
    fn test_reassemble_rejects_mixed_senders() {
        let a = paginate(&set_of(12), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        let b = paginate(&set_of(12), SenderId::new(7, 2), &PlaybackOptions::default(), 80);
        let mixed = [a[0].data.as_slice(), b[1].data.as_slice()];
        assert!(matches!(reassemble(mixed), Err(HapticError::OrderingViolation(_))));
    }

    #[test]
    fn test_reassemble_rejects_inconsistent_totals() {
        let a = paginate(&set_of(12), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        let b = paginate(&set_of(15), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        let mixed = [a[0].data.as_slice(), b[1].data.as_slice()];
        assert!(matches!(reassemble(mixed), Err(HapticError::MalformedStructure(_))));
    }

    #[test]
    fn test_reassemble_restores_order() {
        let packets = paginate(&set_of(25), SenderId::new(7, 1), &PlaybackOptions::default(), 80);
        let shuffled = [packets[2].data.as_slice(), packets[0].data.as_slice(), packets[1].data.as_slice()];
        let (sender, set) = reassemble(shuffled).unwrap();
        assert_eq!(sender, SenderId::new(7, 1));
        assert_eq!(set.len(), 25);
    }

    #[test]
    fn test_reassemble_empty() {
        let none: [&[i32]; 0] = [];
        assert!(reassemble(none).is_err());
    }
}
