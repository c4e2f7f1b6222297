use serde_json::{Map, Number, Value};

use crate::errors::{Error, Result};
use crate::reader::{clean_float, ScspReader};

// Fixed absolute offsets within a decompressed SCSP image. The first
// 8 bytes (string table offset + length) belong to the reader.
pub const HEADER_WIDTH: usize = 22;
pub const HEADER_HEIGHT: usize = 26;
pub const IK_COUNT: usize = 54;
pub const SLOTS_COUNT: usize = 58;
pub const TRANSFORM_COUNT: usize = 62;
pub const PATH_COUNT: usize = 66;
pub const SKINS_COUNT: usize = 70;
pub const EVENTS_COUNT: usize = 74;
pub const ANIMATIONS_COUNT: usize = 78;
pub const HASH_PTR: usize = 82;
pub const SPINE_PTR: usize = 86;
pub const BONES_COUNT: usize = 106;

/// The fixed-layout skeleton header.
pub struct ScspHeader {
    pub width: f32,
    pub height: f32,
    pub hash: String,
    pub spine: String,
}

impl ScspHeader {
    pub fn parse(reader: &mut ScspReader) -> Result<ScspHeader> {
        let width = reader.float32_at(HEADER_WIDTH)?;
        let height = reader.float32_at(HEADER_HEIGHT)?;
        let hash = reader.string_at(HASH_PTR)?;
        let spine = reader.string_at(SPINE_PTR)?;

        if hash.is_empty() {
            return Err(Error::UnsupportedVersion);
        }

        Ok(ScspHeader {
            width,
            height,
            hash,
            spine,
        })
    }

    /// The `skeleton` block of the output document.
    pub fn to_json(&self) -> Result<Value> {
        let mut skeleton = Map::new();

        skeleton.insert("spine".into(), Value::String(self.spine.clone()));
        skeleton.insert("x".into(), Value::Number(Number::from(0)));
        skeleton.insert("y".into(), Value::Number(Number::from(0)));
        skeleton.insert(
            "width".into(),
            Value::Number(clean_float(self.width as f64, 2)?),
        );
        skeleton.insert(
            "height".into(),
            Value::Number(clean_float(self.height as f64, 2)?),
        );
        skeleton.insert("hash".into(), Value::String(self.hash.clone()));

        Ok(Value::Object(skeleton))
    }
}

/// Section entry counts declared at fixed header offsets. These are
/// validation hints for the sections that also carry an inline count
/// word, and the authoritative count for IK, slots, and events, whose
/// inline word the decoder skips unread.
#[derive(Debug, Clone, Copy)]
pub struct SectionCounts {
    pub ik: i16,
    pub slots: i16,
    pub transform: i16,
    pub path: i16,
    pub skins: i16,
    pub events: i16,
    pub animations: i16,
}

impl SectionCounts {
    pub fn parse(reader: &ScspReader) -> Result<SectionCounts> {
        Ok(SectionCounts {
            ik: reader.peek_int16_at(IK_COUNT)?,
            slots: reader.peek_int16_at(SLOTS_COUNT)?,
            transform: reader.peek_int16_at(TRANSFORM_COUNT)?,
            path: reader.peek_int16_at(PATH_COUNT)?,
            skins: reader.peek_int16_at(SKINS_COUNT)?,
            events: reader.peek_int16_at(EVENTS_COUNT)?,
            animations: reader.peek_int16_at(ANIMATIONS_COUNT)?,
        })
    }
}
