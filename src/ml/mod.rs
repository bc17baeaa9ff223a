pub mod backend;
pub mod preprocess;
pub mod postprocess;
pub mod labels;
pub mod inference;

pub use backend::{InferenceBackend, InputTensor, LoadedModel, OutputTensor, IMAGE_SIZE, INPUT_SHAPE};
pub use preprocess::{image_input, load_image_input, random_input, IMAGENET_MEAN, IMAGENET_STD};
pub use postprocess::{build_classification_result, softmax, Softmax, TOP_K};
pub use labels::{ClassLabelResolver, GenericLabels, LabelTable};
pub use inference::{InferenceEngine, LoadedModelInfo};
