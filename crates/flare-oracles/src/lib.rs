//! Clients for Flare's on-chain oracles on the Coston2 testnet.
//!
//! - [`PriceOracle`]: FTSO v2 feeds read through `eth_call`
//! - [`RandomOracle`]: RandomNumberV2 secure randomness
//! - [`FdcOracle`]: Flare Data Connector submission and proof lookup, with a
//!   [`CascadingProofFetcher`] that degrades to a demo proof instead of failing
//!
//! Chain reads go through the [`FeedReader`] and [`RandomSource`] traits so
//! callers can swap the RPC-backed implementations for fakes.

pub mod abi;
pub mod error;
pub mod fdc;
pub mod price;
pub mod random;
pub mod rpc;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{OracleError, Result};
pub use fdc::{
    CascadingProofFetcher, FdcOracle, ProofOutcome, ProofSource, ProofStatus, Submission,
    SubmissionMode,
};
pub use price::{FeedId, FeedReader, FeedReading, PriceOracle, PriceQuote, SUPPORTED_FEEDS};
pub use random::{Decision, RandomDecision, RandomOracle, RandomSource, RandomValue};
pub use rpc::EvmRpc;

use flareconf::OracleConfig;
use price::RpcFeedReader;
use random::RpcRandomSource;
use std::sync::Arc;

/// The three oracles, sharing one RPC client.
#[derive(Clone)]
pub struct FlareOracles {
    pub price: PriceOracle,
    pub random: RandomOracle,
    pub fdc: FdcOracle,
}

impl FlareOracles {
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let rpc = Arc::new(EvmRpc::new(&config.rpc_url, config.rpc_timeout())?);

        Ok(Self {
            price: PriceOracle::new(Arc::new(RpcFeedReader::new(
                rpc.clone(),
                &config.registry_address,
            ))),
            random: RandomOracle::new(Arc::new(RpcRandomSource::new(
                rpc,
                &config.registry_address,
            ))),
            fdc: FdcOracle::from_config(config)?,
        })
    }
}
