pub mod balance;
pub mod configure;
pub mod helpers;
pub mod networks;
pub mod portfolio;
pub mod wallet;
