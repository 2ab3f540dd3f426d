pub mod colors;
pub mod geometry;
pub mod indicator;
pub mod paths;
pub mod period;
pub mod record;
pub mod region;

pub use colors::Color;
pub use geometry::{Feature, FeatureProperties, GeometryPayload};
pub use indicator::{Indicator, IndicatorEntry, IndicatorType};
pub use paths::NONE_SENTINEL;
pub use period::{Period, PeriodSpan};
pub use record::{DataPoint, DataRecord, RecordKey};
pub use region::{EntityChild, Region, RegionKind};
