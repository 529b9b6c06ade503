pub mod artifact;
pub mod gbdt;
pub mod pipeline;

pub mod classifier_trait;
pub mod factory;

pub use artifact::ModelArtifact;
pub use classifier_trait::ClassifierModel;
pub use pipeline::ModelPipeline;
