//! Admin CLI (C9): one subcommand per §6.3 operation, each printing a JSON
//! document to stdout and exiting non-zero with a one-line `stderr` error
//! otherwise — the same `#[derive(Parser)]`/`#[derive(Subcommand)]` style
//! `cli/src/main.rs` already used for its stub dispatch, extended to a
//! real one.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lws_core::{LwsConfig, Network};
use lws_store::{AccountAddress, AccountStatus, RequestInfo, RequestKind, Storage};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "lws-cli", about = "Light-wallet backend admin CLI", version)]
struct Cli {
    /// Directory holding the KV store.
    #[arg(long, global = true)]
    db_path: PathBuf,

    /// `main`, `test` or `dev`.
    #[arg(long, global = true, default_value = "main")]
    network: String,

    /// Print view keys in full instead of redacting them.
    #[arg(long, global = true)]
    show_sensitive: bool,

    /// TOML config file, overlaid with `LWS__`-prefixed environment
    /// variables; see `lws_core::config::LwsConfig`. Supplies
    /// `max_create_queue` unless `--max-create-queue` is also given.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum pending Create requests (only matters when the store is
    /// created fresh by this invocation).
    #[arg(long, global = true)]
    max_create_queue: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Approves pending requests of one kind for the given addresses.
    AcceptRequests {
        #[arg(long, value_enum)]
        kind: RequestKindArg,
        #[arg(long = "view-public", required = true)]
        view_publics: Vec<String>,
    },
    /// Registers an immediately-active account.
    AddAccount {
        #[arg(long)]
        view_public: String,
        #[arg(long)]
        spend_public: String,
        #[arg(long)]
        view_key: String,
    },
    /// Dumps per-table row counts and chain-sync height.
    DebugDatabase,
    /// Lists accounts, optionally filtered by status.
    ListAccounts {
        #[arg(long, value_enum)]
        status: Option<AccountStatusArg>,
    },
    /// Lists pending requests, optionally filtered by kind.
    ListRequests {
        #[arg(long, value_enum)]
        kind: Option<RequestKindArg>,
    },
    /// Changes the lifecycle status of the given accounts.
    ModifyAccountStatus {
        #[arg(long, value_enum)]
        status: AccountStatusArg,
        #[arg(long = "view-public", required = true)]
        view_publics: Vec<String>,
    },
    /// Rejects (deletes) pending requests of one kind.
    RejectRequests {
        #[arg(long, value_enum)]
        kind: RequestKindArg,
        #[arg(long = "view-public", required = true)]
        view_publics: Vec<String>,
    },
    /// Rewinds scan height and discards scanned records for the given
    /// accounts, so the next scan pass re-derives them.
    Rescan {
        #[arg(long)]
        new_start: u64,
        #[arg(long = "view-public", required = true)]
        view_publics: Vec<String>,
    },
    /// Rewinds stored chain state to `height` (C4's rollback protocol).
    Rollback {
        #[arg(long)]
        height: u64,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum RequestKindArg {
    Create,
    Import,
}

impl From<RequestKindArg> for RequestKind {
    fn from(v: RequestKindArg) -> Self {
        match v {
            RequestKindArg::Create => RequestKind::Create,
            RequestKindArg::Import => RequestKind::Import,
        }
    }
}

#[derive(Clone, clap::ValueEnum)]
enum AccountStatusArg {
    Active,
    Inactive,
    Hidden,
}

impl From<AccountStatusArg> for AccountStatus {
    fn from(v: AccountStatusArg) -> Self {
        match v {
            AccountStatusArg::Active => AccountStatus::Active,
            AccountStatusArg::Inactive => AccountStatus::Inactive,
            AccountStatusArg::Hidden => AccountStatus::Hidden,
        }
    }
}

fn status_name(s: AccountStatus) -> &'static str {
    match s {
        AccountStatus::Active => "active",
        AccountStatus::Inactive => "inactive",
        AccountStatus::Hidden => "hidden",
    }
}

fn kind_name(k: RequestKind) -> &'static str {
    match k {
        RequestKind::Create => "create",
        RequestKind::Import => "import",
    }
}

fn decode_view_public(s: &str) -> anyhow::Result<[u8; 32]> {
    let raw = hex::decode(s).map_err(|_| anyhow::anyhow!("{s:?} is not valid hex"))?;
    raw.try_into().map_err(|_| anyhow::anyhow!("{s:?} is not a 32-byte key"))
}

fn decode_view_publics(list: &[String]) -> anyhow::Result<Vec<[u8; 32]>> {
    list.iter().map(|s| decode_view_public(s)).collect()
}

#[derive(Serialize)]
struct AccountView {
    id: u32,
    status: &'static str,
    address: AddressView,
    view_key: Option<String>,
    scan_height: u64,
    start_height: u64,
    last_access_time: u64,
    creation_time: u64,
}

#[derive(Serialize)]
struct AddressView {
    view_public: String,
    spend_public: String,
}

fn account_view(status: AccountStatus, acct: &lws_store::Account, show_sensitive: bool) -> AccountView {
    AccountView {
        id: acct.id,
        status: status_name(status),
        address: AddressView {
            view_public: hex::encode(acct.address.view_public),
            spend_public: hex::encode(acct.address.spend_public),
        },
        view_key: show_sensitive.then(|| hex::encode(acct.view_key)),
        scan_height: acct.scan_height,
        start_height: acct.start_height,
        last_access_time: acct.last_access_time,
        creation_time: acct.creation_time,
    }
}

#[derive(Serialize)]
struct RequestView {
    kind: &'static str,
    address: AddressView,
    view_key: Option<String>,
    start_height: u64,
    creation_time: u64,
}

fn request_view(kind: RequestKind, info: &RequestInfo, show_sensitive: bool) -> RequestView {
    RequestView {
        kind: kind_name(kind),
        address: AddressView {
            view_public: hex::encode(info.address.view_public),
            spend_public: hex::encode(info.address.spend_public),
        },
        view_key: show_sensitive.then(|| hex::encode(info.view_key)),
        start_height: info.start_height,
        creation_time: info.creation_time,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let network = Network::parse(&cli.network)
        .ok_or_else(|| anyhow::anyhow!("unknown --network {:?} (want main|test|dev)", cli.network))?;
    let config = LwsConfig::load(cli.config.as_deref())?;
    let max_create_queue = cli.max_create_queue.unwrap_or(config.scan.max_create_queue);
    let storage = Storage::open(&cli.db_path, network, max_create_queue)?;

    let output: Value = match cli.command {
        Command::AddAccount { view_public, spend_public, view_key } => {
            let view_public = decode_view_public(&view_public)?;
            let spend_public = decode_view_public(&spend_public)?;
            let view_key = decode_view_public(&view_key)?;
            let addr = AccountAddress { view_public, spend_public };
            let acct = storage.add_account(addr, view_key)?;
            json!(account_view(AccountStatus::Active, &acct, cli.show_sensitive))
        }
        Command::AcceptRequests { kind, view_publics } => {
            let vps = decode_view_publics(&view_publics)?;
            let accepted = storage.accept_requests(kind.into(), &vps)?;
            json!({ "accepted": accepted.iter().map(hex::encode).collect::<Vec<_>>() })
        }
        Command::RejectRequests { kind, view_publics } => {
            let vps = decode_view_publics(&view_publics)?;
            let rejected = storage.reject_requests(kind.into(), &vps)?;
            json!({ "rejected": rejected.iter().map(hex::encode).collect::<Vec<_>>() })
        }
        Command::ModifyAccountStatus { status, view_publics } => {
            let vps = decode_view_publics(&view_publics)?;
            let changed = storage.change_status(status.into(), &vps)?;
            json!({ "changed": changed.iter().map(hex::encode).collect::<Vec<_>>() })
        }
        Command::Rescan { new_start, view_publics } => {
            let vps = decode_view_publics(&view_publics)?;
            let changed = storage.rescan(new_start, &vps)?;
            json!({ "changed": changed.iter().map(hex::encode).collect::<Vec<_>>() })
        }
        Command::Rollback { height } => {
            storage.rollback(height)?;
            json!({ "rolled_back_to": height })
        }
        Command::ListAccounts { status } => {
            let accounts = storage.get_accounts(status.map(Into::into))?;
            json!(accounts
                .iter()
                .map(|(s, a)| account_view(*s, a, cli.show_sensitive))
                .collect::<Vec<_>>())
        }
        Command::ListRequests { kind } => {
            let requests = storage.get_requests(kind.map(Into::into))?;
            json!(requests
                .iter()
                .map(|(k, r)| request_view(*k, r, cli.show_sensitive))
                .collect::<Vec<_>>())
        }
        Command::DebugDatabase => {
            let stats = storage.table_stats()?;
            let last_block = storage.get_last_block()?;
            json!({
                "network": cli.network,
                "chain_sync_height": last_block.id,
                "chain_sync_hash": hex::encode(last_block.hash),
                "tables": stats.into_iter().map(|(name, len)| json!({ "name": name, "rows": len })).collect::<Vec<_>>(),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
