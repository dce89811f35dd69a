//! Request parameters -> script command line.
//!
//! Every family reads a few well-known keys from the JSON parameter object,
//! falling back to the toolchain's bundled sample data where a key is
//! missing. Unknown keys are ignored.

use serde_json::Value;

use super::catalog::ArgumentFamily;

const NETWORK: &str = "TESTNET";
const DEFAULT_COMPANY_NAME: &str = "SREE PALANI ANDAVAR AGROS PRIVATE LIMITED";
const DEFAULT_CIN: &str = "U01112TZ2022PTC039493";
const DEFAULT_THRESHOLD: &str = "100";
const DEFAULT_ACTUS_URL: &str = "http://localhost:8083/eventsBatch";
const DEFAULT_EXECUTION_MODE: &str = "ultra_strict";
const DEFAULT_JURISDICTION: &str = "US";
const DEFAULT_BOL_FILE: &str = "./src/data/scf/BILLOFLADING/BOL-VALID-1.json";
const ADVANCED_CONFIG: &str = "src/data/RISK/Advanced/CONFIG/Advanced-VALID-1.json";
const BASEL3_CONFIG: &str = "src/data/RISK/Basel3/CONFIG/basel3-VALID-1.json";
const STABLECOIN_CONFIG: &str = "src/data/RISK/StableCoin/CONFIG/US/StableCoin-VALID-1.json";

/// Process variants recognised in an uploaded BPMN file name.
const PROCESS_VARIANTS: &[&str] = &["Accepted1", "Accepted2", "Rejected1", "Rejected2"];

/// Build the argument list for `family` from the request `parameters`.
pub fn build_args(family: ArgumentFamily, parameters: &Value) -> Vec<String> {
    let p = |keys: &[&str]| param(parameters, keys);
    let or = |keys: &[&str], default: &str| {
        param(parameters, keys).unwrap_or_else(|| default.to_string())
    };

    match family {
        ArgumentFamily::Gleif => vec![
            or(&["companyName", "legalName", "entityName"], DEFAULT_COMPANY_NAME),
            NETWORK.to_string(),
        ],
        ArgumentFamily::CorporateRegistration => with_network(p(&["cin"])),
        ArgumentFamily::Exim => with_network(p(&["companyName", "legalName", "entityName"])),
        ArgumentFamily::ComposedCompliance => vec![
            or(&["companyName"], DEFAULT_COMPANY_NAME),
            or(&["cin"], DEFAULT_CIN),
        ],
        ArgumentFamily::BusinessProcessIntegrity => {
            let process_type = p(&["processType"]);
            let actual_file = p(&["actualProcessFile"]);
            let (expected, actual) = process_paths(process_type.as_deref(), actual_file.as_deref());
            vec![
                process_type.unwrap_or_else(|| "SCF".to_string()),
                expected,
                actual,
            ]
        }
        ArgumentFamily::BusinessStdIntegrity => vec![or(&["filePath"], DEFAULT_BOL_FILE)],
        ArgumentFamily::AdvancedRisk => vec![
            or(&["liquidityThreshold"], DEFAULT_THRESHOLD),
            or(&["actusUrl"], DEFAULT_ACTUS_URL),
            or(&["configFilePath"], ADVANCED_CONFIG),
            or(&["executionMode"], DEFAULT_EXECUTION_MODE),
        ],
        ArgumentFamily::Basel3Risk => vec![
            or(&["lcrThreshold", "liquidityThreshold"], DEFAULT_THRESHOLD),
            or(&["nsfrThreshold"], DEFAULT_THRESHOLD),
            or(&["actusUrl"], DEFAULT_ACTUS_URL),
            or(&["configFilePath"], BASEL3_CONFIG),
        ],
        ArgumentFamily::StablecoinRisk => vec![
            or(&["liquidityThreshold"], DEFAULT_THRESHOLD),
            or(&["actusUrl"], DEFAULT_ACTUS_URL),
            or(&["configFilePath"], STABLECOIN_CONFIG),
            or(&["executionMode"], DEFAULT_EXECUTION_MODE),
            or(&["jurisdiction"], DEFAULT_JURISDICTION),
        ],
        ArgumentFamily::ComposedProof => {
            with_network(p(&["legalName", "entityName", "companyName"]))
        }
    }
}

fn with_network(first: Option<String>) -> Vec<String> {
    first
        .into_iter()
        .chain(std::iter::once(NETWORK.to_string()))
        .collect()
}

/// First key present with a usable value, rendered as a string.
///
/// Null, `false`, and empty strings count as absent.
fn param(parameters: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match parameters.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    })
}

/// Resolve expected/actual BPMN paths for a process type.
///
/// The actual file is chosen by the variant tag found in the uploaded file
/// name, defaulting to `Accepted1`. Unknown process types use the SCF data.
fn process_paths(process_type: Option<&str>, actual_file: Option<&str>) -> (String, String) {
    let (dir, prefix) = match process_type {
        Some("DVP") => ("./src/data/DVP/process", "DVP"),
        Some("STABLECOIN") => ("./src/data/STABLECOIN/process", "STABLECOIN"),
        _ => ("./src/data/scf/process", "SCF"),
    };

    let variant = match process_type {
        Some("SCF" | "DVP" | "STABLECOIN") => actual_file
            .and_then(|name| PROCESS_VARIANTS.iter().find(|v| name.contains(*v)))
            .copied()
            .unwrap_or("Accepted1"),
        _ => "Accepted1",
    };

    (
        format!("{dir}/EXPECTED/{prefix}-Expected.bpmn"),
        format!("{dir}/ACTUAL/{prefix}-{variant}.bpmn"),
    )
}
