pub mod binance_p2p;
pub mod coingecko;
pub mod fiat;
pub mod gold;
pub mod ticker;
pub mod util;
