//! Fixed table of toolchain operations.
//!
//! Each operation maps to one compiled script in the toolchain build
//! directory and to the argument family used to turn request parameters
//! into a command line. Several operation names are aliases that share a
//! script.

/// How request parameters are mapped onto script arguments.
///
/// See [`build_args`](super::args::build_args).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFamily {
    Gleif,
    CorporateRegistration,
    Exim,
    ComposedCompliance,
    BusinessProcessIntegrity,
    BusinessStdIntegrity,
    AdvancedRisk,
    Basel3Risk,
    StablecoinRisk,
    ComposedProof,
}

/// A supported operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub script: &'static str,
    pub family: ArgumentFamily,
}

const GLEIF_SCRIPT: &str = "GLEIFOptimMultiCompanyVerificationTestWithSign.js";
const CORPORATE_SCRIPT: &str = "CorporateRegistrationOptimMultiCompanyVerificationTestWithSign.js";
const EXIM_SCRIPT: &str = "EXIMOptimMultiCompanyVerificationTestWithSign.js";
const COMPOSED_SCRIPT: &str = "ComposedRecursiveOptim3LevelVerificationTestWithSign.js";
const BSDI_SCRIPT: &str = "BusinessStdIntegrityOptimMerkleVerificationTestWithSign.js";
const BPI_SCRIPT: &str = "BusinessProcessIntegrityOptimMerkleVerificationFileTestWithSign.js";
const ADVANCED_RISK_SCRIPT: &str = "RiskLiquidityAdvancedOptimMerkleVerificationTestWithSign.js";
const BASEL3_RISK_SCRIPT: &str = "RiskLiquidityBasel3OptimMerkleVerificationTestWithSign.js";
const STABLECOIN_RISK_SCRIPT: &str = "RiskLiquidityStableCoinOptimMerkleVerificationTestWithSign.js";

pub const OPERATIONS: &[Operation] = &[
    Operation {
        name: "get-GLEIF-verification-with-sign",
        script: GLEIF_SCRIPT,
        family: ArgumentFamily::Gleif,
    },
    Operation {
        name: "get-Corporate-Registration-verification-with-sign",
        script: CORPORATE_SCRIPT,
        family: ArgumentFamily::CorporateRegistration,
    },
    Operation {
        name: "get-EXIM-verification-with-sign",
        script: EXIM_SCRIPT,
        family: ArgumentFamily::Exim,
    },
    Operation {
        name: "get-Composed-Compliance-verification-with-sign",
        script: COMPOSED_SCRIPT,
        family: ArgumentFamily::ComposedCompliance,
    },
    Operation {
        name: "get-BSDI-compliance-verification",
        script: BSDI_SCRIPT,
        family: ArgumentFamily::BusinessStdIntegrity,
    },
    Operation {
        name: "get-BPI-compliance-verification",
        script: BPI_SCRIPT,
        family: ArgumentFamily::BusinessProcessIntegrity,
    },
    Operation {
        name: "get-RiskLiquidityACTUS-Verifier-Test_adv_zk",
        script: ADVANCED_RISK_SCRIPT,
        family: ArgumentFamily::AdvancedRisk,
    },
    Operation {
        name: "get-RiskLiquidityACTUS-Verifier-Test_Basel3_Withsign",
        script: BASEL3_RISK_SCRIPT,
        family: ArgumentFamily::Basel3Risk,
    },
    Operation {
        name: "get-RiskLiquidityBasel3Optim-Merkle-verification-with-sign",
        script: BASEL3_RISK_SCRIPT,
        family: ArgumentFamily::Basel3Risk,
    },
    Operation {
        name: "get-RiskLiquidityAdvancedOptimMerkle-verification-with-sign",
        script: ADVANCED_RISK_SCRIPT,
        family: ArgumentFamily::AdvancedRisk,
    },
    Operation {
        name: "get-StablecoinProofOfReservesRisk-verification-with-sign",
        script: STABLECOIN_RISK_SCRIPT,
        family: ArgumentFamily::StablecoinRisk,
    },
    Operation {
        name: "execute-composed-proof-full-kyc",
        script: COMPOSED_SCRIPT,
        family: ArgumentFamily::ComposedProof,
    },
    Operation {
        name: "execute-composed-proof-financial-risk",
        script: COMPOSED_SCRIPT,
        family: ArgumentFamily::ComposedProof,
    },
    Operation {
        name: "execute-composed-proof-business-integrity",
        script: COMPOSED_SCRIPT,
        family: ArgumentFamily::ComposedProof,
    },
    Operation {
        name: "execute-composed-proof-comprehensive",
        script: COMPOSED_SCRIPT,
        family: ArgumentFamily::ComposedProof,
    },
];

/// Look up an operation by its exact name.
pub fn find(name: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Names of all supported operations, in catalog order.
pub fn operation_names() -> Vec<String> {
    OPERATIONS.iter().map(|op| op.name.to_string()).collect()
}

/// Distinct script files referenced by the catalog.
pub fn required_scripts() -> Vec<&'static str> {
    let mut scripts: Vec<&'static str> = Vec::new();
    for op in OPERATIONS {
        if !scripts.contains(&op.script) {
            scripts.push(op.script);
        }
    }
    scripts
}
