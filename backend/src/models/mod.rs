pub mod mode;
pub mod observing_block;
pub mod sync;
pub mod target;
pub mod template;

pub use mode::{ModeSettings, ObservationMode, TemplatePlan};
pub use observing_block::{populate_from_yml, ObSummary, ObservingBlock};
pub use sync::{ObHandle, SyncState, TemplateHandle};
pub use target::{Magnitudes, Target};
pub use template::{Template, TemplateKind};
