// Comment classifier — Gaussian mixture clustering over feature vectors with
// post-hoc quality/spam/uncertain labeling.

pub mod fit;
pub mod gmm;
pub mod labeling;
pub mod linalg;
pub mod model;
pub mod scaler;
pub mod summary;

pub use fit::{fit_with_retry, retry_once, ClassifierState, CommentClassifier};
pub use labeling::{assign_labels, spam_likelihood, Label, LabelWeights};
pub use model::{
    ClassificationResult, ClassifierConfig, ClusterModel, ComponentSummary, LabelProbability,
    SavedModel,
};
