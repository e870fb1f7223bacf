//! Concrete SPPLY submodules

pub mod custom;
pub mod liquidity_pool;
pub mod migration_offset;
pub mod pool;

pub use custom::CustomSupply;
pub use liquidity_pool::LiquidityPoolSupply;
pub use migration_offset::MigrationOffsetSupply;
pub use pool::{ConstantProductPool, LiquidityPool};
