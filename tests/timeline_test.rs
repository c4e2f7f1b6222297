use serde_json::json;

use scspdec::file::ScspFile;

mod common;

use common::*;

// Appends one animation named "act" with the given timelines to the
// standard scene.
fn animation_image(timeline_count: i16, append: impl FnOnce(&mut ImageBuilder)) -> Vec<u8> {
    let mut b = ImageBuilder::new();

    standard_scene(&mut b, 1);

    b.str_ref("act");
    b.f32(2.0);
    b.i16(timeline_count);
    append(&mut b);

    b.finish()
}

fn decode(image: Vec<u8>) -> serde_json::Value {
    let file = ScspFile::new(image).unwrap();
    file.to_json().unwrap()
}

#[test]
fn linear_tag_emits_no_curve_fields() {
    let image = animation_image(1, |b| {
        b.i16(0); // rotate
        b.i16(0); // bone 0
        b.i16(4);
        b.f32(0.0);
        b.f32(0.0);
        b.f32(1.0);
        b.f32(90.0);
        b.i16(1);
        push_curve_block(b, LINEAR_TAG, &[(0.0, 0.0); 9]);
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["bones"]["root"]["rotate"],
        json!([
            {"time": 0, "angle": 0},
            {"time": 1, "angle": 90}
        ])
    );
}

#[test]
fn bezier_tag_recovers_control_parameters() {
    let image = animation_image(1, |b| {
        b.i16(1); // translate
        b.i16(0);
        b.i16(6); // two frames, three words each
        b.f32(0.0);
        b.f32(0.0);
        b.f32(0.0);
        b.f32(1.0);
        b.f32(10.0);
        b.f32(-10.0);
        b.i16(1);
        push_curve_block(b, BEZIER_TAG, &bezier_samples(0.25, 0.1, 0.75, 0.9));
    });

    let document = decode(image);

    let frames = &document["animations"]["act"]["bones"]["root"]["translate"];

    assert_eq!(frames[1], json!({"time": 1, "x": 10, "y": -10}));

    let first = frames[0].as_object().unwrap();

    let curve = first["curve"].as_f64().unwrap();
    let c2 = first["c2"].as_f64().unwrap();
    let c3 = first["c3"].as_f64().unwrap();
    let c4 = first["c4"].as_f64().unwrap();

    assert!((curve - 0.25).abs() < 1e-3);
    assert!((c2 - 0.1).abs() < 1e-3);
    assert!((c3 - 0.75).abs() < 1e-3);
    assert!((c4 - 0.9).abs() < 1e-3);
}

#[test]
fn attachment_timeline_nulls_empty_names() {
    let image = animation_image(1, |b| {
        b.i16(4);
        b.i16(1); // slot "B"
        b.i16(2); // frame count
        b.f32(0.0);
        b.f32(1.0);
        b.i16(2); // discarded name count
        b.str_ref("sword");
        b.str_ref("");
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["slots"]["B"]["attachment"],
        json!([
            {"time": 0, "name": "sword"},
            {"time": 1, "name": null}
        ])
    );
}

#[test]
fn color_timeline_reads_five_word_frames() {
    let image = animation_image(1, |b| {
        b.i16(5);
        b.i16(0); // slot "A"
        b.i16(10); // two frames at five words each
        b.f32(0.0);
        b.f32(1.0);
        b.f32(0.0);
        b.f32(0.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.i16(1);
        push_curve_block(b, STEPPED_TAG, &[(0.0, 0.0); 9]);
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["slots"]["A"]["color"],
        json!([
            {"time": 0, "color": "FF0000FF", "curve": "stepped"},
            {"time": 1, "color": "FFFFFFFF"}
        ])
    );
}

#[test]
fn two_color_timeline_reads_light_and_dark() {
    let image = animation_image(1, |b| {
        b.i16(14);
        b.i16(0);
        b.i16(8); // one frame
        b.f32(0.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(1.0);
        b.f32(0.5);
        b.f32(0.5);
        b.f32(0.5);
        b.i16(0);
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["slots"]["A"]["twoColor"],
        json!([{"time": 0, "light": "FFFFFFFF", "dark": "808080"}])
    );
}

#[test]
fn ik_timeline_emits_numeric_flags() {
    // A scene with one IK constraint.
    let mut b = ImageBuilder::new();

    standard_header(&mut b, 100.0, 200.0);
    section_counts(&mut b, 1, 1, 1, 0, 0, 0, 0, 1);

    push_identity_bone(&mut b, 0, "root", -1);

    b.i16(1); // ik count word
    push_ik(&mut b, "grab", 0, 1, -1, -1, 0, &[0]);

    b.i16(1); // slots count word
    push_white_slot(&mut b, "A", 0);

    b.i16(0); // transform count
    b.i16(0); // path count
    b.i16(0); // skins count
    b.i16(0); // events count word

    b.i16(1); // animations count
    b.str_ref("act");
    b.f32(1.0);
    b.i16(1);

    b.i16(9);
    b.i16(0); // ik constraint 0
    b.i16(6); // one frame
    b.f32(0.0);
    b.f32(1.0);
    b.f32(0.0);
    b.zeros(4);
    b.f32(1.0);
    b.f32(0.0);
    b.i16(0);

    let document = decode(b.finish());

    assert_eq!(
        document["animations"]["act"]["ik"]["grab"],
        json!([{
            "time": 0,
            "mix": 1,
            "softness": 0,
            "bendPositive": 1,
            "stretch": 0
        }])
    );
}

#[test]
fn events_timeline_reads_times_then_names() {
    let image = animation_image(1, |b| {
        b.i16(7);
        b.i16(2); // frame count, doubles as the peeked target
        b.f32(0.0);
        b.f32(0.5);
        b.i16(0); // pad
        b.str_ref("hit");
        b.str_ref("hit");
    });

    let document = decode(image);

    let act = document["animations"]["act"].as_object().unwrap();
    let keys: Vec<&str> = act.keys().map(|k| k.as_str()).collect();

    assert_eq!(
        keys,
        ["bones", "slots", "ik", "transform", "path", "deform", "events", "duration"]
    );
    assert_eq!(
        act["events"],
        json!([
            {"time": 0, "name": "hit"},
            {"time": 0.5, "name": "hit"}
        ])
    );
}

#[test]
fn draw_order_permutation_becomes_offsets() {
    let image = animation_image(1, |b| {
        b.i16(8);
        b.i16(1); // one frame, doubles as the peeked target
        b.f32(0.0);
        b.i16(0); // curve count
        b.i16(3); // permutation length
        b.i16(1);
        b.zeros(2);
        b.i16(0);
        b.zeros(2);
        b.i16(2);
        b.zeros(2);
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["drawOrder"],
        json!([{
            "time": 0,
            "offsets": [
                {"slot": "A", "offset": 1},
                {"slot": "B", "offset": -1}
            ]
        }])
    );
}

#[test]
fn deform_delta_subtracts_base_vertices() {
    let image = animation_image(1, |b| {
        b.i16(6);
        b.i16(0); // slot "A"
        b.i16(1); // one time-only frame
        b.f32(0.0);
        b.i16(0); // curve count
        b.i16(1); // frame count again
        b.i16(3); // 12 bytes: one leading zero word, two floats
        b.zeros(4);
        b.f32(2.0);
        b.f32(2.0);
        b.str_ref("bb");
        b.i16(0); // skin id, in range
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["deform"]["default"]["A"]["bb"],
        json!([{"time": 0, "vertices": [1, 0], "offset": 1}])
    );
}

#[test]
fn all_zero_deform_delta_is_elided() {
    let image = animation_image(1, |b| {
        b.i16(6);
        b.i16(0);
        b.i16(1);
        b.f32(0.0);
        b.i16(0); // curve count
        b.i16(1);
        b.i16(2); // 8 bytes, exactly the base
        b.f32(1.0);
        b.f32(2.0);
        b.str_ref("bb");
        b.i16(0);
    });

    let document = decode(image);

    assert_eq!(
        document["animations"]["act"]["deform"]["default"]["A"]["bb"],
        json!([{"time": 0}])
    );
}

#[test]
fn path_position_timeline_decodes() {
    // A scene with one path constraint.
    let mut b = ImageBuilder::new();

    standard_header(&mut b, 100.0, 200.0);
    section_counts(&mut b, 1, 0, 1, 0, 1, 0, 0, 1);

    push_identity_bone(&mut b, 0, "root", -1);

    b.i16(0); // ik count word
    b.i16(1); // slots count word
    push_white_slot(&mut b, "A", 0);

    b.i16(0); // transform count

    b.i16(1); // path count
    push_path(
        &mut b,
        "rail",
        0,
        0,
        [0, 0, 0],
        [0.0, 0.0, 0.0, 1.0, 1.0],
        0,
        &[0],
    );

    b.i16(0); // skins count
    b.i16(0); // events count word

    b.i16(1); // animations count
    b.str_ref("act");
    b.f32(1.0);
    b.i16(1);

    b.i16(11);
    b.i16(0); // path constraint 0
    b.i16(4); // two frames, two words each
    b.f32(0.0);
    b.f32(0.25);
    b.f32(1.0);
    b.f32(0.75);
    b.i16(0);

    let document = decode(b.finish());

    assert_eq!(
        document["animations"]["act"]["path"]["rail"]["position"],
        json!([
            {"time": 0, "position": 0.25},
            {"time": 1, "position": 0.75}
        ])
    );
}
