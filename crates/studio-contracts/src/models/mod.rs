mod registry;
mod steps;

pub use registry::{
    ModelRegistry, ModelSpec, CAPABILITY_EDIT, CAPABILITY_IMAGE, CAPABILITY_TEXT,
    CAPABILITY_VISION,
};
pub use steps::{
    Step, StepModels, DEFAULT_MODEL_STEP1, DEFAULT_MODEL_STEP2, DEFAULT_MODEL_STEP3,
};
