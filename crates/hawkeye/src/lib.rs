#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use hawkeye_tensor as tensor;

#[doc(inline)]
pub use hawkeye_3d as k3d;

#[doc(inline)]
pub use hawkeye_data as data;

#[doc(inline)]
pub use hawkeye_train as train;
