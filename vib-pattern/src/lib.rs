//! # 🧩 vib-pattern — Compilador de Padrões HE
//!
//! Valida documentos Haptic Effect (HE 1.0 e 2.0), serializa no formato
//! binário consumido pelo hardware de vibração e pagina conjuntos HE 2.0
//! grandes em pacotes independentes.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  JSON (HE)  │ →  │  Validator  │ →  │    Codec    │ →  │  Paginator  │
//! │ Metadata +  │    │ HE1 leniente│    │ HE1: 0x3 +  │    │ ≤10 padrões │
//! │ Pattern(s)  │    │ HE2 estrito │    │ HE2: pacote │    │ por pacote  │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```
//! use vib_pattern::{compile_str, PlaybackOptions};
//! use vib_core::SenderId;
//!
//! let json = r#"{
//!     "Metadata": { "Version": 1 },
//!     "Pattern": [{ "Event": {
//!         "Type": "transient", "RelativeTime": 0,
//!         "Parameters": { "Intensity": 50, "Frequency": 50 }
//!     }}]
//! }"#;
//! let packets = compile_str(json, &PlaybackOptions::default(), SenderId::new(1, 0)).unwrap();
//! assert_eq!(packets[0].data.len(), 1 + vib_pattern::HE1_EVENT_LEN);
//! ```

pub mod codec;
pub mod compiler;
pub mod model;
pub mod paginator;
pub mod validator;

pub use codec::{
    DecodedPacket, PacketHeader, PlaybackOptions, decode_he1, decode_he2_packet, encode_he1,
    encode_he2_packet, HE1_EVENT_LEN,
};
pub use compiler::{compile, compile_str, DEFAULT_TRANSIENT_TAIL_MS};
pub use model::{
    CurvePoint, Event, EventHeader, HapticDocument, HeVersion, Pattern, PatternSet,
    CONTINUOUS_EVENT, TRANSIENT_EVENT,
};
pub use paginator::{paginate, reassemble, PACKET_PATTERN_CAP};
pub use validator::{declared_version, validate, validate_value, MAX_EVENT_COUNT, MAX_POINT_COUNT};
