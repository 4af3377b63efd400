//! Documento HE → buffers prontos para o scheduler

use tracing::debug;
use vib_core::{CompiledPattern, HapticResult, SenderId};

use crate::codec::{PlaybackOptions, encode_he1};
use crate::model::HapticDocument;
use crate::paginator::paginate;
use crate::validator::validate;

/// Cauda adicionada quando o último evento é transiente
pub const DEFAULT_TRANSIENT_TAIL_MS: u64 = 80;

/// Compila um documento validado
///
/// HE 1.0 produz um único buffer; HE 2.0 produz um pacote por página,
/// todos marcados com `sender`.
pub fn compile(
    document: &HapticDocument,
    options: &PlaybackOptions,
    sender: SenderId,
    transient_tail_ms: u64,
) -> Vec<CompiledPattern> {
    let single_play_ms = document.playback_duration_ms(transient_tail_ms);
    match document {
        HapticDocument::V1(pattern) => {
            debug!("compiled HE 1.0 pattern with {} events, {}ms", pattern.events.len(), single_play_ms);
            vec![options.compile(encode_he1(pattern), single_play_ms)]
        }
        HapticDocument::V2(set) => paginate(set, sender, options, transient_tail_ms),
    }
}

/// Valida e compila em um passo
pub fn compile_str(
    json: &str,
    options: &PlaybackOptions,
    sender: SenderId,
) -> HapticResult<Vec<CompiledPattern>> {
    let document = validate(json)?;
    Ok(compile(&document, options, sender, DEFAULT_TRANSIENT_TAIL_MS))
}
