//! The gauges on the panel.

pub mod hi;
pub mod nav;
pub mod trim_flaps;
pub mod vor1;

pub use hi::HeadingIndicator;
pub use nav::Nav;
pub use trim_flaps::TrimFlaps;
pub use vor1::Vor1;

use crate::bus::VariableBus;
use crate::config::{PanelConfig, Placement};
use crate::instrument::Instrument;
use crate::knobs::{reborrow, KnobInput};

/// Every gauge at its default place: three round gauges in a row with the
/// radio stack underneath.
pub fn standard_set(
    config: &PanelConfig,
    bus: &mut dyn VariableBus,
    mut knobs: Option<&mut dyn KnobInput>,
) -> Vec<Box<dyn Instrument>> {
    let mut set: Vec<Box<dyn Instrument>> = Vec::new();
    set.push(Box::new(HeadingIndicator::new(Placement::new(0, 0, 400), bus, reborrow(&mut knobs))));
    set.push(Box::new(Vor1::new(Placement::new(400, 0, 400), bus, reborrow(&mut knobs))));
    set.push(Box::new(TrimFlaps::new(Placement::new(800, 0, 400), bus, reborrow(&mut knobs))));
    set.push(Box::new(Nav::with_idle_timeout(
        Placement::new(0, 400, 1600),
        bus,
        reborrow(&mut knobs),
        config.adjust_idle_timeout,
    )));
    set
}
