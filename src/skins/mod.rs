use std::collections::HashMap;
use std::convert::TryFrom;

use log::{debug, warn};
use num_enum::TryFromPrimitive;
use serde_json::{Map, Number, Value};

use crate::errors::{Error, RefKind, Result};
use crate::reader::{number, ScspReader};
use crate::sections::SlotTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(i8)]
pub enum AttachmentType {
    Region = 0,
    BoundingBox = 1,
    Mesh = 2,
    LinkedMesh = 3,
    Path = 4,
    Point = 5,
    Clipping = 6,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            AttachmentType::Region => "region",
            AttachmentType::BoundingBox => "boundingbox",
            AttachmentType::Mesh => "mesh",
            AttachmentType::LinkedMesh => "linkedmesh",
            AttachmentType::Path => "path",
            AttachmentType::Point => "point",
            AttachmentType::Clipping => "clipping",
        }
    }
}

/// Type-specific attachment payload. The shared vertex block lives on
/// [`Attachment`] itself.
#[derive(Debug, Clone)]
pub enum Payload {
    Region {
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        width: f32,
        height: f32,
        path: String,
        color: String,
    },
    BoundingBox,
    Mesh {
        uvs: Vec<f32>,
        triangles: Vec<i16>,
        path: String,
        width: f32,
        height: f32,
        color: String,
        hull: i16,
    },
    Path {
        lengths: Vec<f32>,
        closed: bool,
        constant_speed: bool,
    },
    Point,
    Clipping {
        end: String,
    },
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub slot_name: String,
    pub key: String,
    pub kind: AttachmentType,
    pub path: String,
    pub vertices: Vec<f32>,
    pub vertex_count: usize,
    pub payload: Payload,
}

#[derive(Debug, Clone)]
pub struct Skin {
    pub name: String,
    pub attachments: Vec<Attachment>,
}

/// The skins section. Deform timelines resolve their base vertices and
/// skin names back through this table.
pub struct SkinTable {
    skins: Vec<Skin>,
    lookup: HashMap<i16, String>,
}

/// Reads a vertex block: a `bone_info_count`-word bone-info sub-stream
/// (`bone_count` then that many bone ids per logical vertex), one
/// skipped word, then `(x, y, weight)` floats per referenced bone. When
/// `bone_info_count` is zero the block is a plain float list whose
/// count is the skipped word. Returns the flat vertex list and the
/// logical vertex count.
fn vertices(reader: &mut ScspReader) -> Result<(Vec<f32>, usize)> {
    let bone_info_count = reader.int16()?;
    let coord_pos = reader.tell() + bone_info_count.max(0) as usize * 2;
    let coord_weight_count = reader.peek_int16_at(coord_pos)?;

    let mut bone_info: Vec<i16> = Vec::new();
    let mut vertex_count = 0usize;
    let mut words = 0i32;

    for _ in 0..bone_info_count {
        let bone_count = reader.int16()?;
        bone_info.push(bone_count);
        vertex_count += 1;

        for _ in 0..bone_count {
            bone_info.push(reader.int16()?);
        }

        words += bone_count as i32 + 1;
        if words >= bone_info_count as i32 {
            break;
        }
    }

    reader.skip(2);

    let mut verts: Vec<f32> = Vec::new();
    let mut i = 0usize;

    while i < bone_info.len() {
        let bone_count = bone_info[i];
        i += 1;
        verts.push(bone_count as f32);

        for _ in 0..bone_count {
            let bone_id = bone_info[i];
            i += 1;

            let x = reader.float32()?;
            let y = reader.float32()?;
            let weight = reader.float32()?;

            verts.push(bone_id as f32);
            verts.push(x);
            verts.push(y);
            verts.push(weight);
        }
    }

    if bone_info_count == 0 && coord_weight_count != 0 {
        vertex_count = (coord_weight_count.max(0) / 2) as usize;

        for _ in 0..coord_weight_count {
            verts.push(reader.float32()?);
        }
    }

    Ok((verts, vertex_count))
}

impl SkinTable {
    pub fn parse(reader: &mut ScspReader, slots: &SlotTable, hint: i16) -> Result<SkinTable> {
        let skins_count = reader.int16()?;

        if skins_count != hint {
            warn!("skins count {} disagrees with header hint {}", skins_count, hint);
        }

        let mut skins = Vec::with_capacity(skins_count.max(0) as usize);
        let mut lookup = HashMap::new();

        for k in 0..skins_count {
            let name = reader.string()?;

            let skip_count = reader.int16()?;
            reader.skip(2 + skip_count.max(0) as usize * 2);

            let attachments_count = reader.int16()?;
            let mut attachments = Vec::with_capacity(attachments_count.max(0) as usize);

            lookup.insert(k, name.clone());

            for _ in 0..attachments_count {
                let slot_id = reader.int16()?;
                let slot_name = slots.name_at(slot_id)?.to_string();
                let key = reader.string()?;
                let type_id = reader.int8()?;
                let kind = AttachmentType::try_from(type_id).unwrap_or(AttachmentType::Mesh);

                reader.skip(1);
                let path_ptr = reader.uint32()?;
                let path = reader.get_string(path_ptr as usize);

                let (verts, vertex_count) = if kind != AttachmentType::Region {
                    vertices(reader)?
                } else {
                    (Vec::new(), 0)
                };

                let payload = Self::payload(reader, kind, slots)?;

                attachments.push(Attachment {
                    slot_name,
                    key,
                    kind,
                    path,
                    vertices: verts,
                    vertex_count,
                    payload,
                });
            }

            skins.push(Skin { name, attachments });
        }

        debug!("decoded {} skins", skins.len());

        Ok(SkinTable { skins, lookup })
    }

    fn payload(reader: &mut ScspReader, kind: AttachmentType, slots: &SlotTable) -> Result<Payload> {
        match kind {
            AttachmentType::Region => {
                let x = reader.float32()?;
                let y = reader.float32()?;
                let rotation = reader.float32()?;
                let scale_x = reader.float32()?;
                let scale_y = reader.float32()?;
                let width = reader.float32()?;
                let height = reader.float32()?;

                // Unmapped region payload; the skip widths are fixed.
                reader.skip(6);
                reader.skip(86);

                let path = reader.string()?;
                let color = reader.color(true)?;

                Ok(Payload::Region {
                    x,
                    y,
                    rotation,
                    scale_x,
                    scale_y,
                    width,
                    height,
                    path,
                    color,
                })
            }
            AttachmentType::BoundingBox => {
                reader.skip(4);
                reader.skip(4);

                Ok(Payload::BoundingBox)
            }
            AttachmentType::Mesh | AttachmentType::LinkedMesh => {
                let unknown_count = reader.int16()?;
                reader.skip((unknown_count.max(0) as usize) * 4 + 4 * 6 + 8);

                let uvs_count = reader.int16()?;
                let mut uvs = Vec::with_capacity(uvs_count.max(0) as usize);
                for _ in 0..uvs_count {
                    uvs.push(reader.float32()?);
                }

                let triangles_count = reader.int16()?;
                let mut triangles = Vec::with_capacity(triangles_count.max(0) as usize);
                for _ in 0..triangles_count {
                    triangles.push(reader.int16()?);
                }

                // Edges are consumed but never emitted.
                let edges_count = reader.int16()?;
                for _ in 0..edges_count {
                    let _ = reader.int16()?;
                }

                let path = reader.string()?;
                reader.skip(16);
                let width = reader.float32()?;
                let height = reader.float32()?;
                let color = reader.color(true)?;
                let hull = reader.int16()?;

                // Heuristic tail sniffs; retained literally until the
                // trailing layout is understood. Both look at the same
                // position snapshotted before either skip runs.
                let pos = reader.tell();
                if reader.bytes_at(pos + 14, 4) == [0xFF, 0xFF, 0xFF, 0x00] {
                    reader.skip(2);
                }
                if reader.bytes_at(pos, 2) == [0x00, 0x00] {
                    reader.skip(16);
                }

                Ok(Payload::Mesh {
                    uvs,
                    triangles,
                    path,
                    width,
                    height,
                    color,
                    hull,
                })
            }
            AttachmentType::Path => {
                reader.skip(8);

                let lengths_count = reader.int16()?;
                let mut lengths = Vec::with_capacity(lengths_count.max(0) as usize);
                for _ in 0..lengths_count {
                    lengths.push(reader.float32()?);
                }

                let closed = reader.bool8()?;
                let constant_speed = reader.bool8()?;

                Ok(Payload::Path {
                    lengths,
                    closed: closed.unwrap_or(false),
                    constant_speed: constant_speed.unwrap_or(false),
                })
            }
            AttachmentType::Point => Ok(Payload::Point),
            AttachmentType::Clipping => {
                reader.skip(8);

                let end_slot = reader.int16()?;

                Ok(Payload::Clipping {
                    end: slots.name_at(end_slot)?.to_string(),
                })
            }
        }
    }

    pub fn name_at(&self, index: i16) -> Result<&str> {
        self.lookup
            .get(&index)
            .map(|name| name.as_str())
            .ok_or(Error::IndexOutOfRange {
                kind: RefKind::Skin,
                index,
            })
    }

    /// Base vertices of an attachment, for deform delta computation.
    pub fn base_vertices(&self, skin_index: i16, slot_name: &str, key: &str) -> Option<&[f32]> {
        let skin = self.skins.get(skin_index.max(0) as usize)?;

        skin.attachments
            .iter()
            .find(|attachment| attachment.slot_name == slot_name && attachment.key == key)
            .map(|attachment| attachment.vertices.as_slice())
    }

    pub fn entries(&self) -> &[Skin] {
        &self.skins
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut out = Vec::with_capacity(self.skins.len());

        for skin in &self.skins {
            let mut grouped: Map<String, Value> = Map::new();

            for attachment in &skin.attachments {
                let entry = attachment.to_json()?;

                let slot = grouped
                    .entry(attachment.slot_name.clone())
                    .or_insert_with(|| Value::Object(Map::new()));

                if let Some(slot) = slot.as_object_mut() {
                    slot.insert(attachment.key.clone(), entry);
                }
            }

            let mut entry = Map::new();
            entry.insert("name".into(), Value::String(skin.name.clone()));
            entry.insert("attachments".into(), Value::Object(grouped));

            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

fn float_array(values: &[f32]) -> Result<Value> {
    let mut out = Vec::with_capacity(values.len());

    for &v in values {
        out.push(Value::Number(number(v)?));
    }

    Ok(Value::Array(out))
}

impl Attachment {
    fn to_json(&self) -> Result<Value> {
        let mut entry = Map::new();

        entry.insert("type".into(), Value::String(self.kind.as_str().into()));

        match &self.payload {
            Payload::BoundingBox => {
                entry.insert(
                    "vertexCount".into(),
                    Value::Number(Number::from(self.vertex_count)),
                );
                entry.insert("vertices".into(), float_array(&self.vertices)?);
                entry.insert("path".into(), Value::String(self.path.clone()));
            }
            Payload::Path {
                lengths,
                closed,
                constant_speed,
            } => {
                entry.insert("closed".into(), Value::Bool(*closed));
                entry.insert("constantSpeed".into(), Value::Bool(*constant_speed));
                entry.insert("lengths".into(), float_array(lengths)?);
                entry.insert("vertices".into(), float_array(&self.vertices)?);
                entry.insert(
                    "vertexCount".into(),
                    Value::Number(Number::from(self.vertex_count)),
                );
                entry.insert("path".into(), Value::String(self.path.clone()));
            }
            Payload::Region {
                x,
                y,
                rotation,
                scale_x,
                scale_y,
                width,
                height,
                path,
                color,
            } => {
                entry.insert("x".into(), Value::Number(number(*x)?));
                entry.insert("y".into(), Value::Number(number(*y)?));
                entry.insert("rotation".into(), Value::Number(number(*rotation)?));
                entry.insert("scaleX".into(), Value::Number(number(*scale_x)?));
                entry.insert("scaleY".into(), Value::Number(number(*scale_y)?));
                entry.insert("width".into(), Value::Number(number(*width)?));
                entry.insert("height".into(), Value::Number(number(*height)?));
                entry.insert("path".into(), Value::String(path.clone()));

                if color != "FFFFFFFF" {
                    entry.insert("color".into(), Value::String(color.clone()));
                }
            }
            Payload::Clipping { end } => {
                entry.insert("end".into(), Value::String(end.clone()));
                entry.insert("vertices".into(), float_array(&self.vertices)?);
                entry.insert(
                    "vertexCount".into(),
                    Value::Number(Number::from(self.vertex_count)),
                );
                entry.insert("path".into(), Value::String(self.path.clone()));
            }
            Payload::Mesh {
                uvs,
                triangles,
                path,
                width,
                height,
                color,
                hull,
            } => {
                entry.insert("uvs".into(), float_array(uvs)?);
                entry.insert(
                    "triangles".into(),
                    Value::Array(
                        triangles
                            .iter()
                            .map(|&t| Value::Number(Number::from(t)))
                            .collect(),
                    ),
                );
                entry.insert("vertices".into(), float_array(&self.vertices)?);
                entry.insert("hull".into(), Value::Number(Number::from(*hull)));
                entry.insert("edges".into(), Value::Array(Vec::new()));
                entry.insert("width".into(), Value::Number(number(*width)?));
                entry.insert("height".into(), Value::Number(number(*height)?));
                entry.insert("path".into(), Value::String(path.clone()));

                if color != "FFFFFFFF" {
                    entry.insert("color".into(), Value::String(color.clone()));
                }
            }
            Payload::Point => {}
        }

        Ok(Value::Object(entry))
    }
}
