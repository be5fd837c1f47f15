pub mod init;
pub mod layers;
mod loss;
mod model;
mod weights;

pub use loss::{
    softmax_cross_entropy_grad, softmax_cross_entropy_label_grad, square_loss, square_loss_grad,
};
pub use model::{Model, SharedModel};
pub use weights::{load_weights, read_weights, save_weights, write_weights};
