use std::collections::HashMap;
use std::convert::TryFrom;

use log::{debug, warn};
use num_enum::TryFromPrimitive;
use serde_json::{Map, Number, Value};

use crate::errors::{Error, RefKind, Result};
use crate::headers::BONES_COUNT;
use crate::reader::{number, ScspReader};

// Identity tolerance for bone fields: anything closer than this to its
// default is not emitted.
const DEFAULT_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(i8)]
pub enum TransformMode {
    Normal = 0,
    OnlyTranslation = 1,
    NoRotationOrReflection = 2,
    NoScale = 3,
    NoScaleOrReflection = 4,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match *self {
            TransformMode::Normal => "normal",
            TransformMode::OnlyTranslation => "onlyTranslation",
            TransformMode::NoRotationOrReflection => "noRotationOrReflection",
            TransformMode::NoScale => "noScale",
            TransformMode::NoScaleOrReflection => "noScaleOrReflection",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<String>,
    pub length: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub transform_mode: TransformMode,
    pub skin_required: bool,
}

/// The bones section. Starts at the fixed bones-count offset; later
/// sections resolve bone indices through [`BoneTable::name_at`].
pub struct BoneTable {
    bones: Vec<Bone>,
    lookup: HashMap<i16, String>,
}

impl BoneTable {
    pub fn parse(reader: &mut ScspReader) -> Result<BoneTable> {
        let bones_count = reader.int16_at(BONES_COUNT)?;

        let mut bones = Vec::with_capacity(bones_count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..bones_count {
            let _bone_id = reader.int16()?;
            let name = reader.string()?;

            lookup.insert(i, name.clone());

            let parent_id = reader.int16()?;
            let length = reader.float32()?;
            let x = reader.float32()?;
            let y = reader.float32()?;
            let rotation = reader.float32()?;
            let scale_x = reader.float32()?;
            let scale_y = reader.float32()?;
            let shear_x = reader.float32()?;
            let shear_y = reader.float32()?;
            let transform_mode = reader.int8()?;
            let skin_required = reader.bool8()?;
            reader.skip(1);

            let parent = if parent_id == -1 {
                None
            } else {
                let parent = lookup.get(&parent_id).cloned().ok_or(Error::IndexOutOfRange {
                    kind: RefKind::Bone,
                    index: parent_id,
                })?;
                Some(parent)
            };

            bones.push(Bone {
                name,
                parent,
                length,
                x,
                y,
                rotation,
                scale_x,
                scale_y,
                shear_x,
                shear_y,
                transform_mode: TransformMode::try_from(transform_mode)
                    .unwrap_or(TransformMode::Normal),
                skin_required: skin_required.unwrap_or(false),
            });
        }

        // The trailing pad doubles as the next section's count word.
        reader.skip(2);

        debug!("decoded {} bones", bones.len());

        Ok(BoneTable { bones, lookup })
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Bone,
                index,
            })
    }

    pub fn entries(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Vec::with_capacity(self.bones.len());

        for bone in &self.bones {
            let mut entry = Map::new();

            entry.insert("name".into(), Value::String(bone.name.clone()));

            if let Some(ref parent) = bone.parent {
                entry.insert("parent".into(), Value::String(parent.clone()));
            }

            if bone.length.abs() > DEFAULT_EPSILON {
                entry.insert("length".into(), Value::Number(number(bone.length)?));
            }
            if bone.x.abs() > DEFAULT_EPSILON {
                entry.insert("x".into(), Value::Number(number(bone.x)?));
            }
            if bone.y.abs() > DEFAULT_EPSILON {
                entry.insert("y".into(), Value::Number(number(bone.y)?));
            }
            if bone.rotation.abs() > DEFAULT_EPSILON {
                entry.insert("rotation".into(), Value::Number(number(bone.rotation)?));
            }
            if (bone.scale_x - 1.0).abs() > DEFAULT_EPSILON {
                entry.insert("scaleX".into(), Value::Number(number(bone.scale_x)?));
            }
            if (bone.scale_y - 1.0).abs() > DEFAULT_EPSILON {
                entry.insert("scaleY".into(), Value::Number(number(bone.scale_y)?));
            }
            if bone.shear_x.abs() > DEFAULT_EPSILON {
                entry.insert("shearX".into(), Value::Number(number(bone.shear_x)?));
            }
            if bone.shear_y.abs() > DEFAULT_EPSILON {
                entry.insert("shearY".into(), Value::Number(number(bone.shear_y)?));
            }

            entry.insert(
                "transform".into(),
                Value::String(bone.transform_mode.as_str().into()),
            );

            if bone.skin_required {
                entry.insert("skin".into(), Value::Bool(true));
            }

            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub name: String,
    pub bone: String,
    pub color: String,
    pub dark_color: String,
    pub attachment: String,
    pub blend_mode: i16,
}

/// The slots section. Count comes from the fixed header offset; the
/// inline count word is skipped unread.
pub struct SlotTable {
    slots: Vec<Slot>,
    lookup: HashMap<i16, String>,
}

impl SlotTable {
    pub fn parse(reader: &mut ScspReader, bones: &BoneTable, count: i16) -> Result<SlotTable> {
        reader.skip(2);

        let mut slots = Vec::with_capacity(count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..count {
            let _ = reader.int16()?;
            let name = reader.string()?;
            let bone_id = reader.int16()?;

            lookup.insert(i, name.clone());

            let color = reader.color(true)?;
            let dark_color = reader.color(true)?;
            reader.skip(1);

            let attachment = reader.string()?;
            let blend_mode = reader.int16()?;

            slots.push(Slot {
                name,
                bone: bones.name_at(bone_id)?.to_string(),
                color,
                dark_color,
                attachment,
                blend_mode,
            });
        }

        debug!("decoded {} slots", slots.len());

        Ok(SlotTable { slots, lookup })
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Slot,
                index,
            })
    }

    pub fn entries(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let mut entry = Map::new();

            entry.insert("name".into(), Value::String(slot.name.clone()));
            entry.insert("bone".into(), Value::String(slot.bone.clone()));

            if slot.color != "FFFFFFFF" {
                entry.insert("color".into(), Value::String(slot.color.clone()));
            }

            if slot.dark_color != "FFFFFFFF" && slot.dark_color != "00000000" {
                let mut dark = slot.dark_color.clone();
                if dark.ends_with("FF") {
                    dark.truncate(dark.len() - 2);
                }
                entry.insert("darkColor".into(), Value::String(dark));
            }

            if !slot.attachment.is_empty() {
                entry.insert("attachment".into(), Value::String(slot.attachment.clone()));
            }

            if slot.blend_mode != 0 {
                let blend = match slot.blend_mode {
                    1 => "additive",
                    2 => "multiply",
                    3 => "screen",
                    _ => "normal",
                };
                entry.insert("blend".into(), Value::String(blend.into()));
            }

            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

#[derive(Debug, Clone)]
pub struct IkConstraint {
    pub name: String,
    pub order: i16,
    pub bend_positive: bool,
    pub compress: bool,
    pub stretch: bool,
    pub target: String,
    pub bones: Vec<String>,
}

/// The IK constraints section. The count word was consumed as the bones
/// trailing pad, so the fixed header offset is authoritative.
pub struct IkTable {
    constraints: Vec<IkConstraint>,
    lookup: HashMap<i16, String>,
}

impl IkTable {
    pub fn parse(reader: &mut ScspReader, bones: &BoneTable, count: i16) -> Result<IkTable> {
        let mut constraints = Vec::with_capacity(count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..count {
            let name = reader.string()?;

            lookup.insert(i, name.clone());

            let order = reader.int16()?;
            reader.skip(3);
            let bend_positive = reader.bool16()?;
            reader.skip(2);
            let compress = reader.bool16()?;
            reader.skip(7);
            let stretch = reader.bool16()?;
            let target_bone = reader.int16()?;
            let bone_count = reader.int16()?;

            let mut constrained = Vec::with_capacity(bone_count.max(0) as usize);
            for _ in 0..bone_count {
                let bone_id = reader.int16()?;
                constrained.push(bones.name_at(bone_id)?.to_string());
            }

            constraints.push(IkConstraint {
                name,
                order,
                bend_positive,
                compress,
                stretch,
                target: bones.name_at(target_bone)?.to_string(),
                bones: constrained,
            });
        }

        debug!("decoded {} ik constraints", constraints.len());

        Ok(IkTable { constraints, lookup })
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Ik,
                index,
            })
    }

    pub fn entries(&self) -> &[IkConstraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut out = Vec::with_capacity(self.constraints.len());

        for ik in &self.constraints {
            let mut entry = Map::new();

            entry.insert("name".into(), Value::String(ik.name.clone()));
            entry.insert("order".into(), Value::Number(Number::from(ik.order)));
            entry.insert(
                "bones".into(),
                Value::Array(ik.bones.iter().cloned().map(Value::String).collect()),
            );
            entry.insert("target".into(), Value::String(ik.target.clone()));

            // Not recoverable from the image; fixed defaults.
            entry.insert("mix".into(), Value::Number(Number::from(1)));
            entry.insert("softness".into(), Value::Number(Number::from(0)));

            entry.insert("bendPositive".into(), Value::Bool(ik.bend_positive));

            if ik.compress {
                entry.insert("compress".into(), Value::Bool(true));
            }
            if ik.stretch {
                entry.insert("stretch".into(), Value::Bool(true));
            }

            out.push(Value::Object(entry));
        }

        Value::Array(out)
    }
}

#[derive(Debug, Clone)]
pub struct TransformConstraint {
    pub name: String,
    pub order: i16,
    pub skin: bool,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    pub rotation: f32,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_y: f32,
    pub relative: bool,
    pub local: bool,
    pub target: String,
    pub bones: Vec<String>,
}

pub struct TransformTable {
    constraints: Vec<TransformConstraint>,
    lookup: HashMap<i16, String>,
}

impl TransformTable {
    pub fn parse(reader: &mut ScspReader, bones: &BoneTable, hint: i16) -> Result<TransformTable> {
        let count = reader.int16()?;

        if count != hint {
            warn!("transform count {} disagrees with header hint {}", count, hint);
        }

        let mut constraints = Vec::with_capacity(count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..count {
            let name = reader.string()?;

            lookup.insert(i, name.clone());

            let order = reader.int16()?;
            let skin = reader.bool8()?;
            reader.skip(2);

            let rotate_mix = reader.float32()?;
            let translate_mix = reader.float32()?;
            let scale_mix = reader.float32()?;
            let shear_mix = reader.float32()?;

            let rotation = reader.float32()?;
            let x = reader.float32()?;
            let y = reader.float32()?;
            let scale_x = reader.float32()?;
            let scale_y = reader.float32()?;
            let shear_y = reader.float32()?;
            let relative = reader.bool8()?;
            let local = reader.bool8()?;
            let target_bone = reader.int16()?;
            let bone_count = reader.int16()?;

            let mut constrained = Vec::with_capacity(bone_count.max(0) as usize);
            for _ in 0..bone_count {
                let bone_id = reader.int16()?;
                constrained.push(bones.name_at(bone_id)?.to_string());
            }

            constraints.push(TransformConstraint {
                name,
                order,
                skin: skin.unwrap_or(false),
                rotate_mix,
                translate_mix,
                scale_mix,
                shear_mix,
                rotation,
                x,
                y,
                scale_x,
                scale_y,
                shear_y,
                relative: relative.unwrap_or(false),
                local: local.unwrap_or(false),
                target: bones.name_at(target_bone)?.to_string(),
                bones: constrained,
            });
        }

        debug!("decoded {} transform constraints", constraints.len());

        Ok(TransformTable { constraints, lookup })
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Transform,
                index,
            })
    }

    pub fn entries(&self) -> &[TransformConstraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Vec::with_capacity(self.constraints.len());

        for constraint in &self.constraints {
            let mut entry = Map::new();

            entry.insert("name".into(), Value::String(constraint.name.clone()));
            entry.insert("order".into(), Value::Number(Number::from(constraint.order)));
            entry.insert("skin".into(), Value::Bool(constraint.skin));
            entry.insert("target".into(), Value::String(constraint.target.clone()));
            entry.insert(
                "bones".into(),
                Value::Array(
                    constraint
                        .bones
                        .iter()
                        .cloned()
                        .map(Value::String)
                        .collect(),
                ),
            );
            entry.insert(
                "rotateMix".into(),
                Value::Number(number(constraint.rotate_mix)?),
            );
            entry.insert(
                "translateMix".into(),
                Value::Number(number(constraint.translate_mix)?),
            );
            entry.insert(
                "scaleMix".into(),
                Value::Number(number(constraint.scale_mix)?),
            );
            entry.insert(
                "shearMix".into(),
                Value::Number(number(constraint.shear_mix)?),
            );
            entry.insert("rotation".into(), Value::Number(number(constraint.rotation)?));
            entry.insert("x".into(), Value::Number(number(constraint.x)?));
            entry.insert("y".into(), Value::Number(number(constraint.y)?));
            entry.insert("scaleX".into(), Value::Number(number(constraint.scale_x)?));
            entry.insert("scaleY".into(), Value::Number(number(constraint.scale_y)?));
            entry.insert("shearY".into(), Value::Number(number(constraint.shear_y)?));
            entry.insert("relative".into(), Value::Bool(constraint.relative));
            entry.insert("local".into(), Value::Bool(constraint.local));

            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

#[derive(Debug, Clone)]
pub struct PathConstraint {
    pub name: String,
    pub order: i16,
    pub skin: bool,
    pub position_mode: &'static str,
    pub spacing_mode: Option<&'static str>,
    pub rotate_mode: Option<&'static str>,
    pub rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub target: String,
    pub bones: Vec<String>,
}

pub struct PathTable {
    constraints: Vec<PathConstraint>,
    lookup: HashMap<i16, String>,
}

impl PathTable {
    pub fn parse(
        reader: &mut ScspReader,
        bones: &BoneTable,
        slots: &SlotTable,
        hint: i16,
    ) -> Result<PathTable> {
        let count = reader.int16()?;

        if count != hint {
            warn!("path count {} disagrees with header hint {}", count, hint);
        }

        let mut constraints = Vec::with_capacity(count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..count {
            let name = reader.string()?;
            let order = reader.int16()?;
            let skin = reader.bool8()?;
            reader.skip(2);

            let position_mode = if reader.int16()? == 0 { "fixed" } else { "percent" };
            let spacing_mode = match reader.int16()? {
                0 => Some("length"),
                1 => Some("fixed"),
                2 => Some("percent"),
                3 => Some("proportional"),
                _ => None,
            };
            let rotate_mode = match reader.int16()? {
                0 => Some("tangent"),
                1 => Some("chain"),
                2 => Some("chainScale"),
                _ => None,
            };

            let rotation = reader.float32()?;
            let position = reader.float32()?;
            let spacing = reader.float32()?;
            let rotate_mix = reader.float32()?;
            let translate_mix = reader.float32()?;

            let target_slot = reader.int16()?;
            let bone_count = reader.int16()?;

            let mut constrained = Vec::with_capacity(bone_count.max(0) as usize);
            for _ in 0..bone_count {
                let bone_id = reader.int16()?;
                constrained.push(bones.name_at(bone_id)?.to_string());
            }

            lookup.insert(i, name.clone());

            constraints.push(PathConstraint {
                name,
                order,
                skin: skin.unwrap_or(false),
                position_mode,
                spacing_mode,
                rotate_mode,
                rotation,
                position,
                spacing,
                rotate_mix,
                translate_mix,
                target: slots.name_at(target_slot)?.to_string(),
                bones: constrained,
            });
        }

        debug!("decoded {} path constraints", constraints.len());

        Ok(PathTable { constraints, lookup })
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Path,
                index,
            })
    }

    pub fn entries(&self) -> &[PathConstraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Vec::with_capacity(self.constraints.len());

        for constraint in &self.constraints {
            let mut entry = Map::new();

            entry.insert("name".into(), Value::String(constraint.name.clone()));
            entry.insert("order".into(), Value::Number(Number::from(constraint.order)));
            entry.insert("skin".into(), Value::Bool(constraint.skin));
            entry.insert(
                "positionMode".into(),
                Value::String(constraint.position_mode.into()),
            );
            entry.insert(
                "spacingMode".into(),
                constraint
                    .spacing_mode
                    .map(|mode| Value::String(mode.into()))
                    .unwrap_or(Value::Null),
            );
            entry.insert(
                "rotateMode".into(),
                constraint
                    .rotate_mode
                    .map(|mode| Value::String(mode.into()))
                    .unwrap_or(Value::Null),
            );
            entry.insert("rotation".into(), Value::Number(number(constraint.rotation)?));
            entry.insert("position".into(), Value::Number(number(constraint.position)?));
            entry.insert("spacing".into(), Value::Number(number(constraint.spacing)?));
            entry.insert(
                "rotateMix".into(),
                Value::Number(number(constraint.rotate_mix)?),
            );
            entry.insert(
                "translateMix".into(),
                Value::Number(number(constraint.translate_mix)?),
            );
            entry.insert("target".into(), Value::String(constraint.target.clone()));
            entry.insert(
                "bones".into(),
                Value::Array(
                    constraint
                        .bones
                        .iter()
                        .cloned()
                        .map(Value::String)
                        .collect(),
                ),
            );

            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub int_value: i16,
    pub float_value: f32,
    pub string_value: String,
    pub audio: String,
    pub volume: Option<f32>,
    pub balance: Option<f32>,
}

/// The events section. Count comes from the fixed header offset; the
/// inline count word is skipped unread.
pub struct EventTable {
    events: Vec<Event>,
    lookup: HashMap<i16, String>,
}

impl EventTable {
    pub fn parse(reader: &mut ScspReader, count: i16) -> Result<EventTable> {
        reader.skip(2);

        let mut events = Vec::with_capacity(count.max(0) as usize);
        let mut lookup = HashMap::new();

        for i in 0..count {
            let name = reader.string()?;
            let int_value = reader.int16()?;
            let float_value = reader.float32()?;
            reader.skip(2);
            let string_value = reader.string()?;
            let audio = reader.string()?;

            let (volume, balance) = if !audio.is_empty() {
                (Some(reader.float32()?), Some(reader.float32()?))
            } else {
                reader.skip(8);
                (None, None)
            };

            lookup.insert(i, name.clone());

            events.push(Event {
                name,
                int_value,
                float_value,
                string_value,
                audio,
                volume,
                balance,
            });
        }

        debug!("decoded {} events", events.len());

        Ok(EventTable { events, lookup })
    }

    pub fn name_at(&self, index: i16) -> Option<&str> {
        self.lookup.get(&index).map(|name| name.as_str())
    }

    pub fn entries(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Map::new();

        for event in &self.events {
            let mut entry = Map::new();

            entry.insert("int".into(), Value::Number(Number::from(event.int_value)));
            entry.insert("float".into(), Value::Number(number(event.float_value)?));
            entry.insert("string".into(), Value::String(event.string_value.clone()));

            if !event.audio.is_empty() {
                entry.insert("audio".into(), Value::String(event.audio.clone()));
            }
            if let Some(volume) = event.volume {
                entry.insert("volume".into(), Value::Number(number(volume)?));
            }
            if let Some(balance) = event.balance {
                entry.insert("balance".into(), Value::Number(number(balance)?));
            }

            out.insert(event.name.clone(), Value::Object(entry));
        }

        Ok(Value::Object(out))
    }
}
