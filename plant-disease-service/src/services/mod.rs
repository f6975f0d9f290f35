pub mod assistant;
pub mod classifier;
pub mod labels;
pub mod metrics;
pub mod preprocess;
pub mod providers;

pub use assistant::FarmingAssistant;
pub use classifier::{Classification, ClassifierError, ImageClassifier};
pub use self::metrics::{init_metrics, render_metrics};
pub use preprocess::{prepare_image, ImageTensor};
