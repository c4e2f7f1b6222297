use serde_json::{Map, Value};

use crate::errors::Result;
use crate::headers::{ScspHeader, SectionCounts};
use crate::reader::ScspReader;
use crate::sections::{BoneTable, EventTable, IkTable, PathTable, SlotTable, TransformTable};
use crate::skins::SkinTable;
use crate::timelines::AnimationDecoder;

/// A fully decoded SCSP image.
///
/// Sections are decoded in dependency order: bones before the
/// constraints and slots that name them, slots before skins, skins and
/// events before the animation timelines that resolve into them.
pub struct ScspFile {
    pub header: ScspHeader,
    pub bones: BoneTable,
    pub iks: IkTable,
    pub slots: SlotTable,
    pub transforms: TransformTable,
    pub paths: PathTable,
    pub skins: SkinTable,
    pub events: EventTable,
    pub animations: Value,
}

impl ScspFile {
    pub fn new(data: Vec<u8>) -> Result<ScspFile> {
        let mut reader = ScspReader::new(data)?;

        let header = ScspHeader::parse(&mut reader)?;
        let counts = SectionCounts::parse(&reader)?;

        let bones = BoneTable::parse(&mut reader)?;
        let iks = IkTable::parse(&mut reader, &bones, counts.ik)?;
        let slots = SlotTable::parse(&mut reader, &bones, counts.slots)?;
        let transforms = TransformTable::parse(&mut reader, &bones, counts.transform)?;
        let paths = PathTable::parse(&mut reader, &bones, &slots, counts.path)?;
        let skins = SkinTable::parse(&mut reader, &slots, counts.skins)?;
        let events = EventTable::parse(&mut reader, counts.events)?;

        let animations = AnimationDecoder::new(
            &mut reader,
            &bones,
            &slots,
            &iks,
            &transforms,
            &paths,
            &skins,
        )
        .parse(counts.animations)?;

        Ok(ScspFile {
            header,
            bones,
            iks,
            slots,
            transforms,
            paths,
            skins,
            events,
            animations,
        })
    }

    /// Assembles the output document under the fixed top-level key
    /// order.
    pub fn to_json(&self) -> Result<Value> {
        let mut document = Map::new();

        document.insert("skeleton".into(), self.header.to_json()?);
        document.insert("slots".into(), self.slots.to_json()?);
        document.insert("skins".into(), self.skins.to_json()?);
        document.insert("bones".into(), self.bones.to_json()?);
        document.insert("ik".into(), self.iks.to_json());
        document.insert("transform".into(), self.transforms.to_json()?);
        document.insert("path".into(), self.paths.to_json()?);
        document.insert("events".into(), self.events.to_json()?);
        document.insert("animations".into(), self.animations.clone());

        Ok(Value::Object(document))
    }
}
