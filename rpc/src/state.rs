use lws_core::{HttpConfig, Network};
use lws_node::NodeClient;
use lws_store::Storage;

/// Shared handle passed to every handler via `State<AppState>`, mirroring
/// `dxid-rpc::RpcState`'s `{store, hypervisor}` pairing.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub node: NodeClient,
    pub network: Network,
    pub http: HttpConfig,
    /// Flat fee (in atomic units) quoted by `/import_request`.
    pub import_fee: u64,
}
