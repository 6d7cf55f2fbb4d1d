mod artifact;

pub use artifact::{ArtifactValidator, ArtifactValidators};
