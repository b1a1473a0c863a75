mod hedged_race;
mod relay_main;

pub use relay_main::InnerRelay;
