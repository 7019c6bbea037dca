//! Static stage catalogue: which cost items each production stage asks for.

use serde::{Deserialize, Serialize};

/// Production stage of a single crop cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Land preparation and planting.
    Establishment,
    /// Crop maintenance between planting and harvest.
    Maintenance,
    /// Harvest and post-harvest, up to dispatch.
    Harvest,
}

impl StageId {
    pub const ALL: [StageId; 3] = [
        StageId::Establishment,
        StageId::Maintenance,
        StageId::Harvest,
    ];

    /// Position in [`StageId::ALL`].
    pub fn index(self) -> usize {
        match self {
            StageId::Establishment => 0,
            StageId::Maintenance => 1,
            StageId::Harvest => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StageId::Establishment => "Planting",
            StageId::Maintenance => "Crop maintenance",
            StageId::Harvest => "Harvest and post-harvest",
        }
    }
}

/// Name and example unit of an expected cost item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub name: String,
    pub sample_unit: String,
}

/// A stage together with the items it asks for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub id: StageId,
    pub title: String,
    pub items: Vec<ItemTemplate>,
}

fn descriptor(id: StageId, items: &[(&str, &str)]) -> StageDescriptor {
    StageDescriptor {
        id,
        title: id.title().to_string(),
        items: items
            .iter()
            .map(|(name, unit)| ItemTemplate {
                name: (*name).to_string(),
                sample_unit: (*unit).to_string(),
            })
            .collect(),
    }
}

/// Built-in catalogue for a cassava cycle, one descriptor per stage in
/// [`StageId::ALL`] order.
pub fn default_catalogue() -> Vec<StageDescriptor> {
    vec![
        descriptor(
            StageId::Establishment,
            &[
                ("Planting cuttings / seedlings", "thousand cuttings"),
                ("Base fertilization (fertilizers, lime etc.)", "kg or bags"),
                (
                    "Labour (clearing, soil preparation, row marking, planting)",
                    "man-days",
                ),
                (
                    "Machinery / equipment (brush cutter, tractor, implements) for planting",
                    "hours",
                ),
            ],
        ),
        descriptor(
            StageId::Maintenance,
            &[
                ("Top dressing 1", "kg or bags"),
                ("Top dressing 2", "kg or bags"),
                (
                    "Labour (cultivation, residue mulching, general management)",
                    "man-days",
                ),
                ("Machinery / equipment (mulching, cultivation, tractor etc.)", "hours"),
                ("Crop protection / other management inputs", "units"),
            ],
        ),
        descriptor(
            StageId::Harvest,
            &[
                ("Harvest labour", "man-days"),
                (
                    "Processing labour (weighing, peeling, washing, draining, packing, labelling)",
                    "man-days",
                ),
                ("Packaging (bags, trays, film, boxes)", "units"),
                ("Labels / tags", "units"),
                ("Water, cleaning products, chlorine etc.", "litres or units"),
                (
                    "Variable electricity for processing",
                    "kWh (or the total with quantity = 1)",
                ),
                (
                    "Freight to the customer or point of sale",
                    "trips (or quantity = 1 for the season total)",
                ),
            ],
        ),
    ]
}
