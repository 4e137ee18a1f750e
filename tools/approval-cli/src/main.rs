use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, Selector, U256};
use anyhow::{anyhow, bail, Context, Result};
use call_firewall_types::{selector, CompOp, InvariantCheck};
use clap::{Parser, Subcommand};
use firewall_approval_encoder::{
    approval_digest, bundle_call_hash, call_hash, encode_program, nonce_call_hash, sign_approval,
    vector_hash, SignatureApproval,
};
use k256::ecdsa::SigningKey;
use serde::Deserialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Compute the values firewall administrators submit: call ids, vector hashes, signed approvals
/// and invariant programs. Results are printed as JSON on stdout.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Also write the JSON result to this file.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call id of a guarded call.
    ///
    /// Without a discriminator this is the id used by the signature, admin-call and
    /// vectors-or-calls policies.
    CallHash {
        #[command(flatten)]
        call: CallArgs,

        /// Block the call executes in (bundle approvals).
        #[arg(long, conflicts_with = "nonce")]
        block: Option<u64>,

        /// Per-(consumer, sender) nonce (single-call approvals).
        #[arg(long, value_parser = parse_u256)]
        nonce: Option<U256>,
    },

    /// Hash of an ordered selector sequence.
    VectorHash {
        /// Selectors as 0x-prefixed 4-byte hex or canonical signatures, eg `deposit()`.
        #[arg(required = true)]
        selectors: Vec<String>,
    },

    /// Sign a batch of call ids for `approve_calls_via_signature`.
    SignApproval {
        /// Call ids in push order (the last one is consumed first).
        #[arg(long = "call-hash", required = true, value_parser = parse_b256)]
        call_hashes: Vec<FixedBytes<32>>,

        #[arg(long, value_parser = parse_address)]
        origin: Address,

        #[arg(long, value_parser = parse_address)]
        sender: Address,

        /// Current signature nonce of the consumer.
        #[arg(long, value_parser = parse_u256, default_value = "0")]
        nonce: U256,

        /// Absolute expiration (unix seconds); overrides `--ttl`.
        #[arg(long)]
        expiration: Option<u64>,

        /// Expiration relative to now, in seconds.
        #[arg(long, default_value_t = 3_600)]
        ttl: u64,

        /// Path to a file containing the signer private key.
        #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
        private_key_path: Option<PathBuf>,

        /// Signer private key (hex string, 0x...).
        #[arg(long, env = "PKEY", conflicts_with = "private_key_path", hide_env_values = true)]
        private_key: Option<String>,
    },

    /// Encode an invariant program from a JSON list of checks.
    EncodeInvariants {
        /// JSON file, eg `[{"check":"after","slot":0,"op":"gt","rhs":"0","tag":"INVARIANT1"}]`.
        spec: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    #[arg(long, value_parser = parse_address)]
    consumer: Address,

    #[arg(long, value_parser = parse_address)]
    sender: Address,

    /// Defaults to the sender (a direct call from an EOA).
    #[arg(long, value_parser = parse_address)]
    origin: Option<Address>,

    /// Full calldata, 0x-prefixed.
    #[arg(long, value_parser = parse_bytes)]
    data: Bytes,

    #[arg(long, value_parser = parse_u256, default_value = "0")]
    value: U256,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "check", rename_all = "snake_case")]
enum CheckSpec {
    After { slot: u8, op: String, rhs: String, tag: String },
    Unchanged { slot: u8, tag: String },
    DeltaLte { slot: u8, max: String, tag: String },
    AfterSum { a: u8, b: u8, op: String, rhs: String, tag: String },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::CallHash { call, block, nonce } => run_call_hash(call, block, nonce),
        Command::VectorHash { selectors } => run_vector_hash(&selectors)?,
        Command::SignApproval {
            call_hashes,
            origin,
            sender,
            nonce,
            expiration,
            ttl,
            private_key_path,
            private_key,
        } => {
            let key = load_signing_key(private_key_path.as_deref(), private_key.as_deref())?;
            let expiration = match expiration {
                Some(at) => at,
                None => (OffsetDateTime::now_utc().unix_timestamp().max(0) as u64).saturating_add(ttl),
            };
            run_sign_approval(call_hashes, origin, sender, nonce, expiration, &key)?
        }
        Command::EncodeInvariants { spec } => run_encode_invariants(&spec)?,
    };

    let rendered = serde_json::to_string_pretty(&result).context("failed serialising result")?;
    println!("{rendered}");
    if let Some(path) = cli.out.as_deref() {
        write_json_atomic(path, &result)?;
        info!(path = %path.display(), "result written");
    }
    Ok(())
}

fn run_call_hash(call: CallArgs, block: Option<u64>, nonce: Option<U256>) -> Value {
    let origin = call.origin.unwrap_or(call.sender);
    let (hash, kind) = match (block, nonce) {
        (Some(block), _) => (
            bundle_call_hash(call.consumer, call.sender, origin, &call.data, call.value, block),
            "bundle",
        ),
        (None, Some(nonce)) => (
            nonce_call_hash(call.consumer, call.sender, origin, &call.data, call.value, nonce),
            "single",
        ),
        (None, None) => (
            call_hash(call.consumer, call.sender, origin, &call.data, call.value),
            "plain",
        ),
    };
    debug!(kind, %hash, "call hash computed");
    json!({
        "kind": kind,
        "consumer": call.consumer,
        "sender": call.sender,
        "origin": origin,
        "call_hash": hash,
    })
}

fn run_vector_hash(selectors: &[String]) -> Result<Value> {
    let parsed = selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "selectors": parsed,
        "vector_hash": vector_hash(&parsed),
    }))
}

fn run_sign_approval(
    call_hashes: Vec<FixedBytes<32>>,
    origin: Address,
    sender: Address,
    nonce: U256,
    expiration: u64,
    key: &SigningKey,
) -> Result<Value> {
    let mut approval = SignatureApproval {
        call_hashes,
        expiration: U256::from(expiration),
        origin,
        sender,
        nonce,
        signature: Vec::new(),
    };
    sign_approval(&mut approval, key).map_err(|e| anyhow!("signing failed: {e}"))?;

    let signed_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    Ok(json!({
        "signer": signer_address(key),
        "call_hashes": approval.call_hashes,
        "expiration": expiration,
        "origin": origin,
        "sender": sender,
        "nonce": nonce.to_string(),
        "digest": approval_digest(&approval),
        "signature": format!("0x{}", hex::encode(&approval.signature)),
        "signed_at": signed_at,
    }))
}

fn run_encode_invariants(spec: &Path) -> Result<Value> {
    let raw = fs::read_to_string(spec).with_context(|| format!("failed reading {}", spec.display()))?;
    let specs: Vec<CheckSpec> =
        serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", spec.display()))?;
    let checks = specs
        .into_iter()
        .map(to_check)
        .collect::<Result<Vec<_>>>()?;
    let program = encode_program(&checks)?;
    Ok(json!({
        "checks": checks.len(),
        "program": format!("0x{}", hex::encode(&program)),
    }))
}

fn to_check(spec: CheckSpec) -> Result<InvariantCheck> {
    let check = match spec {
        CheckSpec::After { slot, op, rhs, tag } => InvariantCheck::After {
            slot,
            op: parse_comp_op(&op)?,
            rhs: parse_u256(&rhs).map_err(|e| anyhow!(e))?,
            tag,
        },
        CheckSpec::Unchanged { slot, tag } => InvariantCheck::Unchanged { slot, tag },
        CheckSpec::DeltaLte { slot, max, tag } => InvariantCheck::DeltaLte {
            slot,
            max: parse_u256(&max).map_err(|e| anyhow!(e))?,
            tag,
        },
        CheckSpec::AfterSum { a, b, op, rhs, tag } => InvariantCheck::AfterSum {
            a,
            b,
            op: parse_comp_op(&op)?,
            rhs: parse_u256(&rhs).map_err(|e| anyhow!(e))?,
            tag,
        },
    };
    if check.tag().len() > u8::MAX as usize {
        bail!("tag `{}` longer than 255 bytes", check.tag());
    }
    Ok(check)
}

fn parse_comp_op(op: &str) -> Result<CompOp> {
    let op = match op {
        "lt" | "<" => CompOp::Lt,
        "lte" | "<=" => CompOp::Lte,
        "gt" | ">" => CompOp::Gt,
        "gte" | ">=" => CompOp::Gte,
        "eq" | "==" => CompOp::Eq,
        "neq" | "!=" => CompOp::Neq,
        other => bail!("unknown comparison `{other}`"),
    };
    Ok(op)
}

fn parse_selector(s: &str) -> Result<Selector> {
    if s.contains('(') {
        return Ok(selector(s));
    }
    let bytes = parse_hex(s).map_err(|e| anyhow!(e))?;
    if bytes.len() != 4 {
        bail!("selector `{s}` is not 4 bytes");
    }
    Ok(Selector::from_slice(&bytes))
}

fn load_signing_key(path: Option<&Path>, inline: Option<&str>) -> Result<SigningKey> {
    let raw = match (path, inline) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("failed reading key file {}", path.display()))?,
        (None, Some(key)) => key.to_string(),
        (None, None) => {
            return Err(anyhow!(
                "missing signer key: provide --private-key-path or --private-key (or set PRIV_KEY_PATH/PKEY)"
            ))
        }
    };
    let bytes = parse_hex(raw.trim()).map_err(|e| anyhow!(e))?;
    SigningKey::from_slice(&bytes).map_err(|_| anyhow!("invalid secp256k1 private key"))
}

fn signer_address(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| format!("invalid hex: {e}"))
}

fn parse_bytes(s: &str) -> Result<Bytes, String> {
    parse_hex(s).map(Bytes::from)
}

fn parse_address(s: &str) -> Result<Address, String> {
    let bytes = parse_hex(s)?;
    if bytes.len() != 20 {
        return Err(format!("address `{s}` is not 20 bytes"));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_b256(s: &str) -> Result<FixedBytes<32>, String> {
    let bytes = parse_hex(s)?;
    if bytes.len() != 32 {
        return Err(format!("hash `{s}` is not 32 bytes"));
    }
    Ok(FixedBytes::from_slice(&bytes))
}

fn parse_u256(s: &str) -> Result<U256, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|e| format!("invalid uint256 `{s}`: {e}"))
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
