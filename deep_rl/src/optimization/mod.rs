mod adam;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod model_optimizer;
mod optimizer;

pub use adam::{Adam, BETA1, BETA2, EPSILON};
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::{GradientDescentWithMomentum, MOMENTUM};
pub use model_optimizer::ModelOptimizer;
pub use optimizer::Optimizer;
