pub mod cache;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod filter;
pub mod recolor;
pub mod scale;
pub mod selection;
pub mod source;
pub mod view;

pub use cache::DataCache;
pub use config::{DashboardConfig, Endpoints, Palette};
pub use controller::{DrillState, Effect, Msg, RegionDrillController};
pub use driver::Dashboard;
pub use error::{FetchError, FilterError, SelectionError};
pub use filter::CascadingFilter;
pub use scale::{ColorScale, Scale, ScaleKind};
pub use selection::SelectionState;
pub use source::{ChildrenSource, DataSource, HttpSource};
pub use view::{DisplaySnapshot, RenderCommand, ViewAdapter};
