pub mod arith;
pub mod endpoint;
pub mod partition;
pub mod pool;
pub mod protocol;

pub use arith::{factorial, mul_mod};
pub use endpoint::{ServerEndpoint, load_endpoints};
pub use partition::{Span, partition};
pub use protocol::{Dispatcher, FactorialServer, ServerConfig};
