//! Policies - the role-gated entry points onto the bophades modules
//!
//! Each policy is installed through the kernel, binds the modules it depends
//! on, and is granted exactly the module functions it requests. Callers reach
//! the modules only through these policies; ROLES decides which callers may
//! use which policy function.
//!
//! | Policy              | Modules                    | Role                          |
//! |---------------------|----------------------------|-------------------------------|
//! | `RolesAdmin`        | ROLES                      | single admin, two-step handover |
//! | `TreasuryCustodian` | TRSRY                      | `custodian`                   |
//! | `TreasuryConfig`    | TRSRY                      | `treasury_admin`              |
//! | `SupplyConfig`      | SPPLY                      | `supply_admin`, `supply_keeper` |
//! | `BridgeTokenPool`   | MINTR, SPPLY               | relayer address               |
//! | `DepositFacility`   | TRSRY, MINTR, DEPOS        | `deposit_operator`            |
//!
//! # Invariants
//!
//! 1. A disabled policy rejects every enabler-gated entry point
//! 2. The bridge's MINTR approval equals the OHM it has bridged out
//! 3. A bridge receipt never fails delivery; failures are parked for retry
//! 4. Conversions validate every position before changing any of them

pub mod bridge;
pub mod custodian;
pub mod deposit_facility;
pub mod enabler;
pub mod error;
pub mod roles_admin;
pub mod supply_config;
pub mod treasury_config;

pub use bridge::{BridgeMessage, BridgeTokenPool, FailedMessage};
pub use custodian::{TreasuryCustodian, CUSTODIAN_ROLE};
pub use deposit_facility::{DepositFacility, DepositRequest, DEPOSIT_OPERATOR_ROLE, MONTH};
pub use enabler::{Enabled, PolicyEnabler, ADMIN_ROLE, EMERGENCY_ROLE};
pub use error::{PolicyError, Result};
pub use roles_admin::RolesAdmin;
pub use supply_config::{Observations, SupplyConfig, SUPPLY_ADMIN_ROLE, SUPPLY_KEEPER_ROLE};
pub use treasury_config::{TreasuryConfig, TREASURY_ADMIN_ROLE};
