pub mod construction;
pub mod discourse;
pub mod family;
pub mod lexicon;
pub mod linearizer;
pub mod matrix;
pub mod morphology;
pub mod phonology;
pub mod planner;
pub mod registry;
pub mod router;
