//! End-to-end smoke test for dutchmint-node.
//!
//! Starts a real node process with fresh sale params, drives public and
//! allow-list minting plus revenue release over JSON-RPC, then restarts the
//! node on the same data directory and checks nothing was lost.
//!
//! Run with:
//!   cargo test -p dutchmint-node --test smoke

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use dutchmint_core::constants::WEI_PER_ETHER;
use dutchmint_core::params::SaleParams;
use dutchmint_core::types::Address;
use dutchmint_crypto::{AdmissionMessage, Signer};

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    /// Removed on drop when set.
    data_dir: Option<PathBuf>,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(dir) = &self.data_dir {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn spawn_node(state_dir: &Path, rpc_port: u16, params: Option<&Path>) -> Child {
    let node_bin = env!("CARGO_BIN_EXE_dutchmint-node");
    let rpc_addr = format!("127.0.0.1:{rpc_port}");
    let mut cmd = Command::new(node_bin);
    cmd.args(["--data-dir", state_dir.to_str().unwrap(), "--rpc-addr", &rpc_addr]);
    if let Some(p) = params {
        cmd.args(["--sale-params", p.to_str().unwrap()]);
    }
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn dutchmint-node")
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_raw(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    resp.json().await.expect("parse RPC JSON")
}

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let json = rpc_raw(client, url, method, params).await;
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

/// Call `method` expecting failure; returns the JSON-RPC error code.
async fn rpc_error_code(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> i64 {
    let json = rpc_raw(client, url, method, params).await;
    json["error"]["code"]
        .as_i64()
        .unwrap_or_else(|| panic!("expected error from {method}, got {json}"))
}

/// Poll until the RPC server responds or the timeout elapses.
async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "dutchmint_getVersion",
        "params": [],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

fn addr(b: u8) -> Address {
    Address::from_bytes([b; 20])
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_mint_release_and_restart() {
    // ── 1. Prepare temp dir and sale params ───────────────────────────────────
    let data_dir = std::env::temp_dir().join(format!("dutchmint_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();
    let state_dir = data_dir.join("state");

    let authority = Signer::generate();
    let owner = addr(1);
    let (jon, rob, eve) = (addr(10), addr(11), addr(12));

    let params = SaleParams::new(
        owner,
        vec![jon, rob, eve],
        vec![75, 15, 10],
        "SmokeAuction",
        "SMOKE",
        3,
        10,
        8,
        2,
        5 * WEI_PER_ETHER,
    )
    .with_authority(authority.address())
    .with_auction_start(0)
    .with_base_uri("ipfs://smoke/");
    let params_path = data_dir.join("sale-params.json");
    std::fs::write(&params_path, serde_json::to_string(&params).unwrap()).unwrap();

    // ── 2. Start node ─────────────────────────────────────────────────────────
    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");
    let child = spawn_node(&state_dir, rpc_port, Some(&params_path));
    let first = NodeGuard { child, data_dir: None };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "dutchmint-node did not become ready within 20 seconds"
    );

    let info = rpc_call(&http, &rpc_url, "dutchmint_getSaleInfo", serde_json::json!([])).await;
    assert_eq!(info["phase"], "SaleActive");
    assert_eq!(info["total_cap"], 10);

    // ── 3. Public mint ────────────────────────────────────────────────────────
    let buyer = addr(5).to_hex();
    let price = (5 * WEI_PER_ETHER).to_string();
    let alloc = rpc_call(
        &http,
        &rpc_url,
        "dutchmint_mintPublic",
        serde_json::json!([buyer, 1, price]),
    )
    .await;
    assert_eq!(alloc["first_token_id"], 0);

    let code = rpc_error_code(
        &http,
        &rpc_url,
        "dutchmint_mintPublic",
        serde_json::json!([buyer, 1, "1"]),
    )
    .await;
    assert_eq!(code, -32003, "underpayment must be rejected");

    // ── 4. Allow-list mint with a single-use proof ────────────────────────────
    let claimant = addr(6);
    let prefix = info["prefix"].as_str().unwrap().to_string();
    let (hash, sig) = authority
        .issue(&AdmissionMessage::new(prefix, claimant, Some(1)))
        .unwrap();
    let proof = serde_json::json!({ "hash": hash.to_hex(), "signature": sig.to_hex(), "nonce": 1 });
    rpc_call(
        &http,
        &rpc_url,
        "dutchmint_mintAllowList",
        serde_json::json!([claimant.to_hex(), proof, 1, price]),
    )
    .await;
    let code = rpc_error_code(
        &http,
        &rpc_url,
        "dutchmint_mintAllowList",
        serde_json::json!([claimant.to_hex(), proof, 1, price]),
    )
    .await;
    assert_eq!(code, -32011, "replayed proof must be rejected");

    // ── 5. Release revenue ────────────────────────────────────────────────────
    let released = rpc_call(&http, &rpc_url, "dutchmint_release", serde_json::json!([jon.to_hex()])).await;
    assert_eq!(released, "7500000000000000000");
    let code = rpc_error_code(&http, &rpc_url, "dutchmint_release", serde_json::json!([jon.to_hex()])).await;
    assert_eq!(code, -32012);

    let uri = rpc_call(&http, &rpc_url, "dutchmint_tokenURI", serde_json::json!([1])).await;
    assert_eq!(uri, "ipfs://smoke/1");

    // ── 6. Restart on the same store without params ───────────────────────────
    drop(first);
    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");
    let child = spawn_node(&state_dir, rpc_port, None);
    let _guard = NodeGuard { child, data_dir: Some(data_dir) };
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "restarted dutchmint-node did not become ready within 20 seconds"
    );

    let info = rpc_call(&http, &rpc_url, "dutchmint_getSaleInfo", serde_json::json!([])).await;
    assert_eq!(info["total_supply"], 2);
    let owner_of = rpc_call(&http, &rpc_url, "dutchmint_ownerOf", serde_json::json!([1])).await;
    assert_eq!(owner_of, claimant.to_hex());
    let consumed = rpc_call(
        &http,
        &rpc_url,
        "dutchmint_isProofConsumed",
        serde_json::json!([hash.to_hex()]),
    )
    .await;
    assert_eq!(consumed, true);
    let revenue = rpc_call(&http, &rpc_url, "dutchmint_getRevenue", serde_json::json!([])).await;
    assert_eq!(revenue["total_received"], (10 * WEI_PER_ETHER).to_string());
    assert_eq!(revenue["total_released"], "7500000000000000000");
}
