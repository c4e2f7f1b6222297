use std::convert::TryFrom;

use log::{debug, warn};
use num_enum::TryFromPrimitive;
use serde_json::{Map, Number, Value};

use crate::curve::{CurveParams, SAMPLE_COUNT};
use crate::errors::{Error, RefKind, Result};
use crate::reader::{clean_float, number, ScspReader, FLOAT_PRECISION};
use crate::sections::{BoneTable, IkTable, PathTable, SlotTable, TransformTable};
use crate::skins::SkinTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(i16)]
pub enum TimelineType {
    Rotate = 0,
    Translate = 1,
    Scale = 2,
    Shear = 3,
    Attachment = 4,
    Color = 5,
    Deform = 6,
    Events = 7,
    DrawOrder = 8,
    Ik = 9,
    Transform = 10,
    PathPosition = 11,
    PathSpacing = 12,
    PathMix = 13,
    TwoColor = 14,
}

// Absolute vertex data attached to one deform frame before the base
// attachment is subtracted.
struct DeformFrame {
    values: Vec<f32>,
    leading: usize,
}

/// Decodes the animations section: per animation, a string key, a
/// duration, and a run of tagged timelines. Frame loops are word-budget
/// loops, not frame-count loops; each timeline type consumes a known
/// number of 16-bit words per frame.
pub struct AnimationDecoder<'a> {
    reader: &'a mut ScspReader,
    bones: &'a BoneTable,
    slots: &'a SlotTable,
    iks: &'a IkTable,
    transforms: &'a TransformTable,
    paths: &'a PathTable,
    skins: &'a SkinTable,
}

impl<'a> AnimationDecoder<'a> {
    pub fn new(
        reader: &'a mut ScspReader,
        bones: &'a BoneTable,
        slots: &'a SlotTable,
        iks: &'a IkTable,
        transforms: &'a TransformTable,
        paths: &'a PathTable,
        skins: &'a SkinTable,
    ) -> Self {
        AnimationDecoder {
            reader,
            bones,
            slots,
            iks,
            transforms,
            paths,
            skins,
        }
    }

    pub fn parse(mut self, hint: i16) -> Result<Value> {
        let animations_count = self.reader.int16()?;

        if animations_count != hint {
            warn!(
                "animations count {} disagrees with header hint {}",
                animations_count, hint
            );
        }

        let mut animations = Map::new();

        for _ in 0..animations_count {
            let key = self.reader.string()?;
            let duration = self.reader.float32()?;
            let timeline_count = self.reader.int16()?;

            let animation = self.animation(duration, timeline_count)?;
            animations.insert(key, animation);
        }

        debug!("decoded {} animations", animations.len());

        Ok(Value::Object(animations))
    }

    fn animation(&mut self, duration: f32, timeline_count: i16) -> Result<Value> {
        let mut bones_out: Map<String, Value> = Map::new();
        let mut slots_out: Map<String, Value> = Map::new();
        let mut iks_out: Map<String, Value> = Map::new();
        let mut transforms_out: Map<String, Value> = Map::new();
        let mut paths_out: Map<String, Value> = Map::new();
        let mut deform_out: Map<String, Value> = Map::new();
        let mut draw_order: Vec<Value> = Vec::new();
        let mut events_out: Vec<Value> = Vec::new();

        let mut decoded = 0;

        while decoded < timeline_count {
            let type_raw = self.reader.int16()?;
            let target = self.reader.peek_int16()?;

            let ty = match TimelineType::try_from(type_raw) {
                Ok(ty) => ty,
                Err(_) => {
                    warn!("unknown timeline type {}, stopping animation", type_raw);
                    break;
                }
            };

            // Types 7 and 8 reuse the target word as their frame count.
            if ty != TimelineType::Events && ty != TimelineType::DrawOrder {
                self.reader.skip(2);
            }

            match ty {
                TimelineType::Rotate
                | TimelineType::Translate
                | TimelineType::Scale
                | TimelineType::Shear => {
                    let name = self.bones.name_at(target)?.to_string();
                    let frames = self.frames(ty)?;

                    let field = match ty {
                        TimelineType::Rotate => "rotate",
                        TimelineType::Translate => "translate",
                        TimelineType::Scale => "scale",
                        _ => "shear",
                    };

                    insert_nested(&mut bones_out, &name, field, frames_to_value(frames));
                }
                TimelineType::Attachment => {
                    let name = self.slots.name_at(target)?.to_string();
                    let frames = self.attachment_timeline()?;

                    merge_attachment(&mut slots_out, &name, frames);
                }
                TimelineType::Color => {
                    let name = self.slots.name_at(target)?.to_string();
                    let frames = self.color_timeline()?;

                    insert_nested(&mut slots_out, &name, "color", frames_to_value(frames));
                }
                TimelineType::Deform => {
                    let slot_name = self.slots.name_at(target)?.to_string();
                    let (skin_id, attachment_key, frames) = self.deform_timeline(&slot_name)?;
                    let skin_name = self.skins.name_at(skin_id)?.to_string();

                    let skin_entry = deform_out
                        .entry(skin_name)
                        .or_insert_with(|| Value::Object(Map::new()));

                    if let Some(skin_entry) = skin_entry.as_object_mut() {
                        let slot_entry = skin_entry
                            .entry(slot_name)
                            .or_insert_with(|| Value::Object(Map::new()));

                        if let Some(slot_entry) = slot_entry.as_object_mut() {
                            slot_entry.insert(attachment_key, frames_to_value(frames));
                        }
                    }
                }
                TimelineType::Events => {
                    events_out = self.events_timeline()?;
                }
                TimelineType::DrawOrder => {
                    draw_order = self.draw_order_timeline()?;
                }
                TimelineType::Ik => {
                    let name = self.iks.name_at(target)?.to_string();
                    let frames = self.frames(ty)?;

                    iks_out.insert(name, frames_to_value(frames));
                }
                TimelineType::Transform => {
                    let name = self.transforms.name_at(target)?.to_string();
                    let frames = self.frames(ty)?;

                    transforms_out.insert(name, frames_to_value(frames));
                }
                TimelineType::PathPosition | TimelineType::PathSpacing | TimelineType::PathMix => {
                    let name = self.paths.name_at(target)?.to_string();
                    let frames = self.frames(ty)?;

                    let field = match ty {
                        TimelineType::PathPosition => "position",
                        TimelineType::PathSpacing => "spacing",
                        _ => "mix",
                    };

                    insert_nested(&mut paths_out, &name, field, frames_to_value(frames));
                }
                TimelineType::TwoColor => {
                    let name = self.slots.name_at(target)?.to_string();
                    let frames = self.frames(ty)?;

                    insert_nested(&mut slots_out, &name, "twoColor", frames_to_value(frames));
                }
            }

            decoded += 1;
        }

        let mut animation = Map::new();

        animation.insert("bones".into(), Value::Object(bones_out));
        animation.insert("slots".into(), Value::Object(slots_out));
        animation.insert("ik".into(), Value::Object(iks_out));
        animation.insert("transform".into(), Value::Object(transforms_out));
        animation.insert("path".into(), Value::Object(paths_out));
        animation.insert("deform".into(), Value::Object(deform_out));

        if !draw_order.is_empty() {
            animation.insert("drawOrder".into(), Value::Array(draw_order));
        }
        if !events_out.is_empty() {
            animation.insert("events".into(), Value::Array(events_out));
        }

        animation.insert("duration".into(), Value::Number(number(duration)?));

        Ok(Value::Object(animation))
    }

    /// The shared frame loop: reads a word budget, then frames until the
    /// budget is spent, then the curve block.
    fn frames(&mut self, ty: TimelineType) -> Result<Vec<Map<String, Value>>> {
        let count = self.reader.int16()?;

        let mut list = Vec::new();
        let mut words = 0i32;

        while words < count as i32 {
            let mut frame = Map::new();

            frame.insert("time".into(), Value::Number(number(self.reader.float32()?)?));

            match ty {
                TimelineType::Translate | TimelineType::Scale | TimelineType::Shear => {
                    frame.insert("x".into(), Value::Number(number(self.reader.float32()?)?));
                    frame.insert("y".into(), Value::Number(number(self.reader.float32()?)?));
                    words += 3;
                }
                TimelineType::Rotate => {
                    frame.insert(
                        "angle".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    words += 2;
                }
                TimelineType::PathPosition | TimelineType::PathSpacing => {
                    frame.insert(
                        "position".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    words += 2;
                }
                TimelineType::TwoColor => {
                    frame.insert("light".into(), Value::String(self.reader.color(true)?));
                    frame.insert("dark".into(), Value::String(self.reader.color(false)?));
                    words += 8;
                }
                TimelineType::Transform => {
                    frame.insert(
                        "rotateMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    frame.insert(
                        "translateMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    frame.insert(
                        "scaleMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    frame.insert(
                        "shearMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    words += 5;
                }
                TimelineType::Ik => {
                    frame.insert("mix".into(), Value::Number(number(self.reader.float32()?)?));
                    frame.insert(
                        "softness".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    self.reader.skip(4);
                    frame.insert(
                        "bendPositive".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    frame.insert(
                        "stretch".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    words += 6;
                }
                TimelineType::PathMix => {
                    frame.insert(
                        "rotateMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    frame.insert(
                        "translateMix".into(),
                        Value::Number(number(self.reader.float32()?)?),
                    );
                    words += 3;
                }
                _ => {
                    words += 1;
                }
            }

            list.push(frame);
        }

        self.apply_curves(ty, &mut list)?;

        Ok(list)
    }

    /// Reads the curve block: a count word, then for every frame but
    /// the last a 4-byte tag and 9 sampled points.
    fn apply_curves(&mut self, ty: TimelineType, list: &mut [Map<String, Value>]) -> Result<()> {
        let curve_count = self.reader.int16()?;

        if curve_count == 0 || ty == TimelineType::DrawOrder {
            return Ok(());
        }

        for i in 0..list.len().saturating_sub(1) {
            let params = self.curve_params()?;
            params.apply(&mut list[i]);
        }

        Ok(())
    }

    fn curve_params(&mut self) -> Result<CurveParams> {
        let tag_bytes = self.reader.peek_bytes(4);
        if tag_bytes.len() < 4 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        let mut tag = [0u8; 4];
        tag.copy_from_slice(tag_bytes);
        self.reader.skip(4);

        // The samples are raw bytes, deliberately not NaN-checked: a
        // junk trace fits to a clamped curve instead of failing the
        // file.
        let sample_bytes = self.reader.peek_bytes(SAMPLE_COUNT * 8);
        if sample_bytes.len() < SAMPLE_COUNT * 8 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        let mut points = [(0f32, 0f32); SAMPLE_COUNT];
        for i in 0..SAMPLE_COUNT {
            let mut x = [0u8; 4];
            let mut y = [0u8; 4];
            x.copy_from_slice(&sample_bytes[i * 8..i * 8 + 4]);
            y.copy_from_slice(&sample_bytes[i * 8 + 4..i * 8 + 8]);
            points[i] = (f32::from_le_bytes(x), f32::from_le_bytes(y));
        }
        self.reader.skip(SAMPLE_COUNT * 8);

        CurveParams::fit(tag, &points)
    }

    // Type 4: all times first, a discarded name count, then all names.
    fn attachment_timeline(&mut self) -> Result<Vec<Map<String, Value>>> {
        let frame_count = self.reader.int16()?;

        let mut list = Vec::with_capacity(frame_count.max(0) as usize);
        for _ in 0..frame_count {
            let mut frame = Map::new();
            frame.insert("time".into(), Value::Number(number(self.reader.float32()?)?));
            list.push(frame);
        }

        let _name_count = self.reader.int16()?;

        for frame in &mut list {
            let name = self.reader.string()?;
            let value = if name.is_empty() {
                Value::Null
            } else {
                Value::String(name)
            };
            frame.insert("name".into(), value);
        }

        Ok(list)
    }

    // Type 5: the declared word budget is five per frame.
    fn color_timeline(&mut self) -> Result<Vec<Map<String, Value>>> {
        let frame_count = self.reader.int16()?;

        let mut list = Vec::with_capacity((frame_count.max(0) / 5) as usize);
        for _ in 0..frame_count / 5 {
            let mut frame = Map::new();
            frame.insert("time".into(), Value::Number(number(self.reader.float32()?)?));
            frame.insert("color".into(), Value::String(self.reader.color(true)?));
            list.push(frame);
        }

        self.apply_curves(TimelineType::Color, &mut list)?;

        Ok(list)
    }

    // Type 7: all times first, a 2-byte pad, then all event names.
    fn events_timeline(&mut self) -> Result<Vec<Value>> {
        let events_count = self.reader.int16()?;

        let mut list = Vec::with_capacity(events_count.max(0) as usize);
        for _ in 0..events_count {
            let mut frame = Map::new();
            frame.insert("time".into(), Value::Number(number(self.reader.float32()?)?));
            list.push(frame);
        }

        self.reader.skip(2);

        for frame in &mut list {
            let name = self.reader.string()?;
            frame.insert("name".into(), Value::String(name));
        }

        Ok(list.into_iter().map(Value::Object).collect())
    }

    // Type 8: per frame, a permutation of slot indices; emitted as the
    // displaced slots with their offsets.
    fn draw_order_timeline(&mut self) -> Result<Vec<Value>> {
        let mut list = self.frames(TimelineType::DrawOrder)?;

        for frame in &mut list {
            let draw_order_count = self.reader.int16()?;

            let mut permutation = Vec::with_capacity(draw_order_count.max(0) as usize);
            for _ in 0..draw_order_count {
                let index = self.reader.int16()?;
                self.reader.skip(2);
                permutation.push(index);
            }

            if draw_order_count <= 0 {
                continue;
            }

            let mut offsets = Vec::new();

            for i in 0..draw_order_count {
                let position = permutation
                    .iter()
                    .position(|&v| v == i)
                    .ok_or(Error::IndexOutOfRange {
                        kind: RefKind::DrawOrder,
                        index: i,
                    })? as i64;

                if position != i as i64 {
                    let mut entry = Map::new();
                    entry.insert(
                        "slot".into(),
                        Value::String(self.slots.name_at(i)?.to_string()),
                    );
                    entry.insert(
                        "offset".into(),
                        Value::Number(Number::from(position - i as i64)),
                    );
                    offsets.push(Value::Object(entry));
                }
            }

            frame.insert("offsets".into(), Value::Array(offsets));
        }

        Ok(list.into_iter().map(Value::Object).collect())
    }

    // Type 6: time-only frames plus curves, then per frame a byte span
    // of absolute vertex floats (with a leading zero run), then the
    // attachment key and an optional skin id.
    fn deform_timeline(&mut self, slot_name: &str) -> Result<(i16, String, Vec<Map<String, Value>>)> {
        let mut list = self.frames(TimelineType::Deform)?;

        let count = self.reader.int16()?;
        let mut deform_frames: Vec<Option<DeformFrame>> = Vec::with_capacity(list.len());

        for _ in 0..count.max(0).min(list.len() as i16) {
            let offset_bytes = self.reader.int16()? as i32 * 4;

            let mut consumed = 0i32;
            let mut leading = 0usize;

            while self.reader.peek_uint32()? == 0 {
                self.reader.skip(4);
                leading += 4;
                consumed += 4;
            }

            let mut values = Vec::new();

            while consumed < offset_bytes {
                values.push(self.reader.float32()?);
                consumed += 4;

                let remaining = (offset_bytes - consumed) as usize;
                let tail = self.reader.peek_bytes(remaining);

                if tail.len() == remaining && tail.iter().all(|&b| b == 0) {
                    self.reader.skip(remaining);
                    break;
                }
            }

            deform_frames.push(if values.is_empty() {
                None
            } else {
                Some(DeformFrame {
                    values,
                    leading: leading / 4,
                })
            });
        }

        let key_ptr = self.reader.uint32()?;
        let key = self.reader.get_string(key_ptr as usize);

        let peeked = self.reader.peek_int16()?;
        let skin_id = if peeked >= 0 && (peeked as usize) < self.skins.len() {
            self.reader.skip(2);
            peeked
        } else {
            0
        };

        // Subtract the base attachment vertices; an all-zero delta or a
        // length mismatch drops the vertices field.
        for (i, deform) in deform_frames.into_iter().enumerate() {
            let old = std::mem::replace(&mut list[i], Map::new());

            let mut frame = Map::new();
            frame.insert("time".into(), old.get("time").cloned().unwrap_or(Value::Null));

            if let Some(deform) = deform {
                let base = self
                    .skins
                    .base_vertices(skin_id, slot_name, &key)
                    .ok_or(Error::IndexOutOfRange {
                        kind: RefKind::Skin,
                        index: skin_id,
                    })?;

                if deform.values.len() == base.len() {
                    let mut deltas = Vec::with_capacity(deform.values.len());
                    let mut all_zero = true;

                    for (value, base) in deform.values.iter().zip(base.iter()) {
                        let delta =
                            clean_float(*value as f64 - *base as f64, FLOAT_PRECISION)?;

                        if delta != Number::from(0) {
                            all_zero = false;
                        }

                        deltas.push(Value::Number(delta));
                    }

                    if !all_zero {
                        frame.insert("vertices".into(), Value::Array(deltas));
                        if deform.leading != 0 {
                            frame.insert(
                                "offset".into(),
                                Value::Number(Number::from(deform.leading)),
                            );
                        }
                    } else if deform.leading != 0 {
                        frame.insert(
                            "offset".into(),
                            Value::Number(Number::from(deform.leading)),
                        );
                    }
                } else if deform.leading != 0 {
                    frame.insert("offset".into(), Value::Number(Number::from(deform.leading)));
                }
            }

            for curve_key in &["curve", "c2", "c3", "c4"] {
                if let Some(value) = old.get(*curve_key) {
                    frame.insert((*curve_key).to_string(), value.clone());
                }
            }

            list[i] = frame;
        }

        Ok((skin_id, key, list))
    }
}

fn frames_to_value(frames: Vec<Map<String, Value>>) -> Value {
    Value::Array(frames.into_iter().map(Value::Object).collect())
}

// Inserts `frames` at `parent[name][field]`, creating the intermediate
// object on first use.
fn insert_nested(parent: &mut Map<String, Value>, name: &str, field: &str, frames: Value) {
    let entry = parent
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));

    if let Some(entry) = entry.as_object_mut() {
        entry.insert(field.to_string(), frames);
    }
}

// Attachment timelines for the same slot accumulate instead of
// replacing each other.
fn merge_attachment(slots_out: &mut Map<String, Value>, name: &str, frames: Vec<Map<String, Value>>) {
    let entry = slots_out
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));

    if let Some(entry) = entry.as_object_mut() {
        match entry.get_mut("attachment").and_then(Value::as_array_mut) {
            Some(existing) => {
                existing.extend(frames.into_iter().map(Value::Object));
            }
            None => {
                entry.insert("attachment".into(), frames_to_value(frames));
            }
        }
    }
}
