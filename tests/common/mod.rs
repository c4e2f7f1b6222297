#![allow(dead_code)]

use std::collections::HashMap;

use scspdec::headers;

/// Builds synthetic SCSP images for tests: a zero-filled fixed header
/// region, appended section records, and a string table collected at
/// the end of the image.
pub struct ImageBuilder {
    image: Vec<u8>,
    strings: Vec<u8>,
    interned: HashMap<String, u32>,
}

impl ImageBuilder {
    pub fn new() -> ImageBuilder {
        ImageBuilder {
            // Fixed header region through the bones count word.
            image: vec![0; 108],
            strings: Vec::new(),
            interned: HashMap::new(),
        }
    }

    pub fn put_i16(&mut self, offset: usize, value: i16) {
        self.image[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, offset: usize, value: u32) {
        self.image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, offset: usize, value: f32) {
        self.image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.interned.get(s) {
            return offset;
        }

        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        self.interned.insert(s.to_string(), offset);

        offset
    }

    pub fn put_str_ptr(&mut self, offset: usize, s: &str) {
        let ptr = self.intern(s);
        self.put_u32(offset, ptr);
    }

    pub fn i16(&mut self, value: i16) {
        self.image.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.image.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32(&mut self, value: f32) {
        self.image.extend_from_slice(&value.to_le_bytes());
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.image.extend_from_slice(bytes);
    }

    pub fn zeros(&mut self, count: usize) {
        self.image.extend(std::iter::repeat(0).take(count));
    }

    pub fn str_ref(&mut self, s: &str) {
        let ptr = self.intern(s);
        self.u32(ptr);
    }

    pub fn finish(mut self) -> Vec<u8> {
        let strings_abs = self.image.len();
        let strings_len = self.strings.len();

        self.put_u32(0, (strings_abs - 8) as u32);
        self.put_u32(4, strings_len as u32);

        let mut image = self.image;
        image.extend(self.strings);
        image
    }
}

/// Fills the fixed skeleton header: dimensions, hash, spine version.
pub fn standard_header(b: &mut ImageBuilder, width: f32, height: f32) {
    b.put_f32(headers::HEADER_WIDTH, width);
    b.put_f32(headers::HEADER_HEIGHT, height);
    b.put_str_ptr(headers::HASH_PTR, "hMu+UT1nR1M");
    b.put_str_ptr(headers::SPINE_PTR, "3.8.75");
}

/// Declares the section counts at their fixed offsets and the bones
/// count word.
pub fn section_counts(
    b: &mut ImageBuilder,
    bones: i16,
    ik: i16,
    slots: i16,
    transform: i16,
    path: i16,
    skins: i16,
    events: i16,
    animations: i16,
) {
    b.put_i16(headers::BONES_COUNT, bones);
    b.put_i16(headers::IK_COUNT, ik);
    b.put_i16(headers::SLOTS_COUNT, slots);
    b.put_i16(headers::TRANSFORM_COUNT, transform);
    b.put_i16(headers::PATH_COUNT, path);
    b.put_i16(headers::SKINS_COUNT, skins);
    b.put_i16(headers::EVENTS_COUNT, events);
    b.put_i16(headers::ANIMATIONS_COUNT, animations);
}

/// Appends one bone record.
pub fn push_bone(
    b: &mut ImageBuilder,
    index: i16,
    name: &str,
    parent: i16,
    length: f32,
    x: f32,
    y: f32,
    rotation: f32,
    scale_x: f32,
    scale_y: f32,
    shear_x: f32,
    shear_y: f32,
    transform_mode: i8,
    skin_required: u8,
) {
    b.i16(index);
    b.str_ref(name);
    b.i16(parent);
    b.f32(length);
    b.f32(x);
    b.f32(y);
    b.f32(rotation);
    b.f32(scale_x);
    b.f32(scale_y);
    b.f32(shear_x);
    b.f32(shear_y);
    b.bytes(&[transform_mode as u8, skin_required, 0]);
}

/// An identity bone.
pub fn push_identity_bone(b: &mut ImageBuilder, index: i16, name: &str, parent: i16) {
    push_bone(b, index, name, parent, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0, 0);
}

/// Appends one slot record.
pub fn push_slot(
    b: &mut ImageBuilder,
    name: &str,
    bone: i16,
    color: [f32; 4],
    dark: [f32; 4],
    attachment: &str,
    blend: i16,
) {
    b.i16(0);
    b.str_ref(name);
    b.i16(bone);
    for c in color.iter() {
        b.f32(*c);
    }
    for c in dark.iter() {
        b.f32(*c);
    }
    b.bytes(&[0]);
    b.str_ref(attachment);
    b.i16(blend);
}

pub fn push_white_slot(b: &mut ImageBuilder, name: &str, bone: i16) {
    push_slot(
        b,
        name,
        bone,
        [1.0, 1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0, 1.0],
        "",
        0,
    );
}

/// Appends a plain (unweighted) vertex block.
pub fn push_plain_vertices(b: &mut ImageBuilder, floats: &[f32]) {
    b.i16(0);
    b.i16(floats.len() as i16);
    for &v in floats {
        b.f32(v);
    }
}

/// Appends a skin preamble: name, empty skip region, attachment count.
pub fn push_skin_header(b: &mut ImageBuilder, name: &str, attachments: i16) {
    b.str_ref(name);
    b.i16(0);
    b.zeros(2);
    b.i16(attachments);
}

/// Appends a boundingbox attachment holding `floats` as its vertices.
pub fn push_boundingbox(b: &mut ImageBuilder, slot: i16, key: &str, floats: &[f32]) {
    b.i16(slot);
    b.str_ref(key);
    b.bytes(&[1, 0]); // type, pad
    let path = b.intern("");
    b.u32(path);
    push_plain_vertices(b, floats);
    b.zeros(8);
}

/// Appends one event record.
pub fn push_event(
    b: &mut ImageBuilder,
    name: &str,
    int_value: i16,
    float_value: f32,
    string_value: &str,
    audio: &str,
    volume: f32,
    balance: f32,
) {
    b.str_ref(name);
    b.i16(int_value);
    b.f32(float_value);
    b.zeros(2);
    b.str_ref(string_value);
    b.str_ref(audio);
    if audio.is_empty() {
        b.zeros(8);
    } else {
        b.f32(volume);
        b.f32(balance);
    }
}

/// A 4-byte curve tag plus 9 sampled points.
pub fn push_curve_block(b: &mut ImageBuilder, tag: [u8; 4], points: &[(f32, f32); 9]) {
    b.bytes(&tag);
    for &(x, y) in points.iter() {
        b.f32(x);
        b.f32(y);
    }
}

pub const STEPPED_TAG: [u8; 4] = [0x00, 0x00, 0x80, 0x3F];
pub const LINEAR_TAG: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
pub const BEZIER_TAG: [u8; 4] = [0x00, 0x00, 0x00, 0x40];

/// Appends one IK constraint record.
pub fn push_ik(
    b: &mut ImageBuilder,
    name: &str,
    order: i16,
    bend_positive: i16,
    compress: i16,
    stretch: i16,
    target: i16,
    bones: &[i16],
) {
    b.str_ref(name);
    b.i16(order);
    b.zeros(3);
    b.i16(bend_positive);
    b.zeros(2);
    b.i16(compress);
    b.zeros(7);
    b.i16(stretch);
    b.i16(target);
    b.i16(bones.len() as i16);
    for &id in bones {
        b.i16(id);
    }
}

/// Appends one transform constraint record.
pub fn push_transform(
    b: &mut ImageBuilder,
    name: &str,
    order: i16,
    skin: u8,
    mixes: [f32; 4],
    pose: [f32; 6],
    relative: u8,
    local: u8,
    target: i16,
    bones: &[i16],
) {
    b.str_ref(name);
    b.i16(order);
    b.bytes(&[skin]);
    b.zeros(2);
    for m in mixes.iter() {
        b.f32(*m);
    }
    for p in pose.iter() {
        b.f32(*p);
    }
    b.bytes(&[relative, local]);
    b.i16(target);
    b.i16(bones.len() as i16);
    for &id in bones {
        b.i16(id);
    }
}

/// Appends one path constraint record.
pub fn push_path(
    b: &mut ImageBuilder,
    name: &str,
    order: i16,
    skin: u8,
    modes: [i16; 3],
    values: [f32; 5],
    target: i16,
    bones: &[i16],
) {
    b.str_ref(name);
    b.i16(order);
    b.bytes(&[skin]);
    b.zeros(2);
    for m in modes.iter() {
        b.i16(*m);
    }
    for v in values.iter() {
        b.f32(*v);
    }
    b.i16(target);
    b.i16(bones.len() as i16);
    for &id in bones {
        b.i16(id);
    }
}

/// A one-bone, three-slot, one-skin scene that timeline tests append
/// animations to. The skin holds a boundingbox "bb" with base vertices
/// [1.0, 2.0] under slot "A".
pub fn standard_scene(b: &mut ImageBuilder, animations: i16) {
    standard_header(b, 100.0, 200.0);
    section_counts(b, 1, 0, 3, 0, 0, 1, 1, animations);

    push_identity_bone(b, 0, "root", -1);

    b.i16(0); // ik count word
    b.i16(3); // slots count word
    push_white_slot(b, "A", 0);
    push_white_slot(b, "B", 0);
    push_white_slot(b, "C", 0);

    b.i16(0); // transform count
    b.i16(0); // path count

    b.i16(1); // skins count
    push_skin_header(b, "default", 1);
    push_boundingbox(b, 0, "bb", &[1.0, 2.0]);

    b.i16(1); // events count word
    push_event(b, "hit", 3, 0.5, "", "", 0.0, 0.0);

    b.i16(animations);
}

/// Samples a cubic Bezier with the given control parameters at the
/// fixed trace positions.
pub fn bezier_samples(cx1: f64, cy1: f64, cx2: f64, cy2: f64) -> [(f32, f32); 9] {
    let mut points = [(0f32, 0f32); 9];

    for (i, point) in points.iter_mut().enumerate() {
        let t = 0.1 + 0.1 * i as f64;
        let b1 = 3.0 * (1.0 - t) * (1.0 - t) * t;
        let b2 = 3.0 * (1.0 - t) * t * t;
        let cubed = t * t * t;

        *point = (
            (b1 * cx1 + b2 * cx2 + cubed) as f32,
            (b1 * cy1 + b2 * cy2 + cubed) as f32,
        );
    }

    points
}
