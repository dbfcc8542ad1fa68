//! Ready-made configurations for the MIRI and NIRSpec trending runs

use std::collections::BTreeMap;

use super::{
    Cadence, ChannelSpec, ConditionGroup, ConditionSpec, LampSpec, NominalWheelSpec, TrendingConfig,
    WheelSpec,
};
use crate::condition::Predicate;
use crate::Result;

fn label_is(mnemonic: &str, label: &str) -> ConditionSpec {
    ConditionSpec::new(mnemonic, Predicate::EqualsLabel(label.to_string()))
}

fn label_is_not(mnemonic: &str, label: &str) -> ConditionSpec {
    ConditionSpec::new(mnemonic, Predicate::NotEqualsLabel(label.to_string()))
}

fn above(mnemonic: &str, threshold: f64) -> ConditionSpec {
    ConditionSpec::new(mnemonic, Predicate::GreaterThan(threshold))
}

fn below(mnemonic: &str, threshold: f64) -> ConditionSpec {
    ConditionSpec::new(mnemonic, Predicate::LessThan(threshold))
}

fn nominals(table: &[(&str, f64)]) -> BTreeMap<String, f64> {
    table.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// MIRI filter wheel ratio nominals
pub const MIRI_FW_NOMINALS: &[(&str, f64)] = &[
    ("FND", -164.46),
    ("OPAQUE", 380.42),
    ("F1000W", -23.88),
    ("F1130W", 138.04),
    ("F1280W", -298.14),
    ("P750L", 12.79),
    ("F1500W", -377.32),
    ("F1800W", 435.61),
    ("F2100W", -126.04),
    ("F560W", 218.13),
    ("FLENS", -212.44),
    ("F2300C", 306.03),
    ("F770W", -61.90),
    ("F1550C", 188.88),
    ("F2550W", -323.65),
    ("F1140C", 83.08),
    ("F2550WR", -255.18),
    ("F1065C", 261.62),
];

/// MIRI grating wheel (bands 2/3) ratio nominals
pub const MIRI_GW23_NOMINALS: &[(&str, f64)] =
    &[("SHORT", 619.81), ("MEDIUM", 373.31), ("LONG", 441.4)];

/// MIRI grating wheel (bands 1/4) ratio nominals
pub const MIRI_GW14_NOMINALS: &[(&str, f64)] =
    &[("SHORT", 627.49), ("MEDIUM", 342.71), ("LONG", 408.75)];

/// MIRI contamination control cover ratio nominals
pub const MIRI_CCC_NOMINALS: &[(&str, f64)] =
    &[("LOCKED", 577.23), ("OPEN", 507.86), ("CLOSED", 399.90)];

/// MIRI mechanisms with a position-sensor supply voltage
const MIRI_WHEELS: [&str; 4] = ["FW", "GW14", "GW23", "CCC"];

/// Labels used by the lamp selector when no lamp is selected.
const NIRSPEC_LAMP_IGNORED: [&str; 2] = ["NO_LAMP", "DUMMY"];

fn miri_wheel(wheel: &str, table: &[(&str, f64)]) -> NominalWheelSpec {
    NominalWheelSpec {
        label: format!("IMIR_HK_{wheel}_CUR_POS"),
        ratio: format!("IMIR_HK_{wheel}_POS_RATIO"),
        validity: vec![above(&format!("IMIR_HK_{wheel}_POS_VOLT"), 250.0)],
        nominals: nominals(table),
        ignored_labels: vec!["UNKNOWN".to_string()],
    }
}

/// MIRI daily run: ICE secondary voltages with the high voltage on, the
/// mechanism position-sensor supplies and the wheel positions.
///
/// # Errors
///
/// Never fails for the built-in definition; the `Result` comes from
/// validation in [`super::TrendingConfigBuilder::build`].
pub fn miri_daily() -> Result<TrendingConfig> {
    let ice_powered = ConditionGroup::new(
        "ice powered",
        vec![above("IMIR_HK_ICE_SEC_VOLT1", 25.0)],
        [
            "IMIR_HK_ICE_SEC_VOLT1",
            "IMIR_HK_ICE_SEC_VOLT2",
            "IMIR_HK_ICE_SEC_VOLT3",
            "IMIR_HK_ICE_SEC_VOLT4",
            "SE_ZIMIRICEA",
        ],
    )
    .with_table("IMIR_HK_ICE_SEC_VOLT4", "IMIR_HK_ICE_SEC_VOLT4_HV_ON")
    .with_table("SE_ZIMIRICEA", "SE_ZIMIRICEA_HV_ON");

    let mut builder = TrendingConfig::builder(Cadence::Daily).condition_group(ice_powered);
    for wheel in MIRI_WHEELS {
        let supply = format!("IMIR_HK_{wheel}_POS_VOLT");
        builder = builder.group(
            format!("{wheel} supply on"),
            vec![above(&supply, 250.0)],
            [supply.as_str()],
        );
    }

    builder
        .nominal_wheel(miri_wheel("FW", MIRI_FW_NOMINALS))
        .nominal_wheel(miri_wheel("GW23", MIRI_GW23_NOMINALS))
        .nominal_wheel(miri_wheel("GW14", MIRI_GW14_NOMINALS))
        .nominal_wheel(miri_wheel("CCC", MIRI_CCC_NOMINALS))
        .build()
}

/// MIRI 15-minute run: ICE housekeeping with the mechanisms idle, and
/// detector electronics while both detectors are ready.
///
/// # Errors
///
/// See [`miri_daily`].
pub fn miri_fifteen_minute() -> Result<TrendingConfig> {
    let ice_idle = ConditionGroup::new(
        "ice idle",
        vec![
            label_is("IMIR_HK_IMG_CAL_LOOP", "OFF"),
            label_is("IMIR_HK_IFU_CAL_LOOP", "OFF"),
            label_is("IMIR_HK_POM_LOOP", "OFF"),
            below("IMIR_HK_ICE_SEC_VOLT1", 1.0),
            above("SE_ZIMIRICEA", 0.2),
        ],
        [
            "SE_ZIMIRICEA",
            "SE_ZBUSVLT",
            "IMIR_HK_ICE_SEC_VOLT4",
            "IGDP_MIR_ICE_INTER_TEMP",
            "ST_ZTC1MIRIA",
            "ST_ZTC1MIRIB",
            "IGDP_MIR_ICE_T1P_CRYO",
            "IGDP_MIR_ICE_T2R_CRYO",
            "IGDP_MIR_ICE_T3LW_CRYO",
            "IGDP_MIR_ICE_T4SW_CRYO",
            "IGDP_MIR_ICE_T5IMG_CRYO",
            "IGDP_MIR_ICE_T6DECKCRYO",
            "IGDP_MIR_ICE_T7IOC_CRYO",
            "IGDP_MIR_ICE_FW_CRYO",
            "IGDP_MIR_ICE_CCC_CRYO",
            "IGDP_MIR_ICE_GW14_CRYO",
            "IGDP_MIR_ICE_GW23_CRYO",
            "IGDP_MIR_ICE_POMP_CRYO",
            "IGDP_MIR_ICE_POMR_CRYO",
            "IGDP_MIR_ICE_IFU_CRYO",
            "IGDP_MIR_ICE_IMG_CRYO",
        ],
    )
    .with_table("IMIR_HK_ICE_SEC_VOLT4", "IMIR_HK_ICE_SEC_VOLT4_IDLE")
    .with_table("SE_ZIMIRICEA", "SE_ZIMIRICEA_IDLE");

    TrendingConfig::builder(Cadence::FifteenMinute)
        .condition_group(ice_idle)
        .group(
            "detectors ready",
            vec![
                above("SE_ZIMIRFPEA", 0.5),
                label_is("IGDP_IT_MIR_IC_STATUS", "DETECTOR_READY"),
                label_is("IGDP_IT_MIR_LW_STATUS", "DETECTOR_READY"),
            ],
            [
                "SE_ZIMIRFPEA",
                "IMIR_PDU_V_DIG_5V",
                "IMIR_PDU_I_DIG_5V",
                "IMIR_PDU_V_ANA_5V",
                "IMIR_PDU_I_ANA_5V",
                "IMIR_PDU_V_ANA_N5V",
                "IMIR_PDU_I_ANA_N5V",
                "IMIR_PDU_V_ANA_7V",
                "IMIR_PDU_I_ANA_7V",
                "IMIR_PDU_V_ANA_N7V",
                "IMIR_PDU_I_ANA_N7V",
                "IMIR_SPW_V_DIG_2R5V",
                "IMIR_PDU_V_REF_2R5V",
                "IGDP_MIR_IC_V_VDETCOM",
                "IGDP_MIR_SW_V_VDETCOM",
                "IGDP_MIR_LW_V_VDETCOM",
                "IGDP_MIR_IC_V_VSSOUT",
                "IGDP_MIR_SW_V_VSSOUT",
                "IGDP_MIR_LW_V_VSSOUT",
                "IGDP_MIR_IC_V_VRSTOFF",
                "IGDP_MIR_SW_V_VRSTOFF",
                "IGDP_MIR_LW_V_VRSTOFF",
                "IGDP_MIR_IC_V_VP",
                "IGDP_MIR_SW_V_VP",
                "IGDP_MIR_LW_V_VP",
                "IGDP_MIR_IC_V_VDDUC",
                "IGDP_MIR_SW_V_VDDUC",
                "IGDP_MIR_LW_V_VDDUC",
                "IMIR_IC_SCE_ANA_TEMP1",
                "IMIR_SW_SCE_ANA_TEMP1",
                "IMIR_LW_SCE_ANA_TEMP1",
                "IMIR_IC_SCE_DIG_TEMP",
                "IMIR_SW_SCE_DIG_TEMP",
                "IMIR_LW_SCE_DIG_TEMP",
                "IGDP_MIR_IC_DET_TEMP",
                "IGDP_MIR_LW_DET_TEMP",
                "IGDP_MIR_SW_DET_TEMP",
            ],
        )
        .build()
}

fn nirspec_lamp() -> LampSpec {
    LampSpec {
        event: "INRSI_CAA_ON_FLAG".to_string(),
        on_state: "ON".to_string(),
        off_state: "OFF".to_string(),
        label: "INRSH_LAMP_SEL".to_string(),
        channels: vec![
            ChannelSpec {
                name: "CURR".to_string(),
                mnemonic: "INRSI_C_CAA_CURRENT".to_string(),
            },
            ChannelSpec {
                name: "VOLT".to_string(),
                mnemonic: "INRSI_C_CAA_VOLTAGE".to_string(),
            },
        ],
        ignored_labels: NIRSPEC_LAMP_IGNORED.iter().map(ToString::to_string).collect(),
        table_prefix: "LAMP".to_string(),
    }
}

fn nirspec_wheel(event: &str, label: &str, ratio: &str) -> WheelSpec {
    WheelSpec {
        event: event.to_string(),
        completion_state: "SUCCESS".to_string(),
        label: label.to_string(),
        ratio: ratio.to_string(),
        ignored_labels: Vec::new(),
    }
}

/// NIRSpec daily run: calibration assembly, lamp activations and the
/// filter and grating wheel positions.
///
/// # Errors
///
/// See [`miri_daily`].
pub fn nirspec_daily() -> Result<TrendingConfig> {
    TrendingConfig::builder(Cadence::Daily)
        .group(
            "filter telemetry rate",
            vec![ConditionSpec::new("ICTM_RT_FILTER", Predicate::EqualsNumber(10.0))],
            [
                "INRSD_ALG_ACC_P12C",
                "INRSD_ALG_ACC_N12C",
                "INRSD_ALG_ACC_3D3_1D5_C",
                "INRSD_ALG_CHASSIS",
                "INRSD_ALG_A1_VDD_C",
                "INRSD_ALG_A2_VDD_C",
                "INRSD_ALG_A1_TEMP",
                "INRSD_ALG_A2_TEMP",
            ],
        )
        .group(
            "calibration assembly powered",
            vec![label_is("INRSH_CAA_PWRF_ST", "ON")],
            ["INRSH_CAA_VREFOFF", "INRSH_CAA_VREF"],
        )
        .lamp(nirspec_lamp())
        .wheel(nirspec_wheel(
            "INRSI_FWA_MOVE_ST",
            "INRSI_FWA_MECH_POS",
            "INRSI_C_FWA_POSITION",
        ))
        .wheel(nirspec_wheel(
            "INRSI_GWA_MOVE_ST",
            "INRSI_GWA_MECH_POS",
            "INRSI_C_GWA_X_POSITION",
        ))
        .wheel(nirspec_wheel(
            "INRSI_GWA_MOVE_ST",
            "INRSI_GWA_MECH_POS",
            "INRSI_C_GWA_Y_POSITION",
        ))
        .build()
}

/// NIRSpec 15-minute run: power supplies outside exposures, reference
/// voltages without a lamp and mechanism electronics while nothing moves.
///
/// # Errors
///
/// See [`miri_daily`].
pub fn nirspec_fifteen_minute() -> Result<TrendingConfig> {
    TrendingConfig::builder(Cadence::FifteenMinute)
        .group(
            "no exposure running",
            vec![label_is_not("INRSD_EXP_STAT", "STARTED")],
            [
                "INRSH_HK_P15V",
                "INRSH_HK_N15V",
                "INRSH_HK_VMOTOR",
                "INRSH_HK_P5V",
                "INRSH_HK_2P5V",
                "INRSH_HK_ADCTGAIN",
                "INRSH_HK_ADCTOFFSET",
            ],
        )
        .group(
            "no lamp selected",
            vec![label_is("INRSH_LAMP_SEL", "NO_LAMP")],
            ["INRSH_CAA_VREFOFF", "INRSH_CAA_VREF"],
        )
        .group(
            "mechanisms idle",
            vec![label_is_not("INRSM_MOVE_STAT", "STARTED")],
            [
                "INRSM_MCE_AIC_1R5_V",
                "INRSM_MCE_AIC_3R3_V",
                "INRSM_MCE_AIC_5_V",
                "INRSM_MCE_AIC_P12_V",
                "INRSM_MCE_AIC_N12_V",
                "INRSM_MCE_AIC_3R3_I",
                "INRSM_MCE_AIC_5_I",
                "INRSM_MCE_AIC_P12_I",
                "INRSM_MCE_AIC_N12_I",
                "INRSM_MCE_MDP_P5_V",
                "INRSM_MCE_MDP_N5_V",
            ],
        )
        .unconditioned(["GP_ZPSVOLT", "SE_ZINRSICEA"])
        .build()
}

/// Look up a preset by name.
///
/// Accepted names: `miri_daily`, `miri_15min`, `nirspec_daily`,
/// `nirspec_15min`.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] for an unknown name.
pub fn by_name(name: &str) -> Result<TrendingConfig> {
    match name {
        "miri_daily" => miri_daily(),
        "miri_15min" => miri_fifteen_minute(),
        "nirspec_daily" => nirspec_daily(),
        "nirspec_15min" => nirspec_fifteen_minute(),
        other => Err(crate::Error::Config(format!("unknown preset '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for name in ["miri_daily", "miri_15min", "nirspec_daily", "nirspec_15min"] {
            let config = by_name(name).unwrap();
            assert!(config.validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn test_preset_cadences() {
        assert_eq!(miri_daily().unwrap().cadence, Cadence::Daily);
        assert_eq!(nirspec_fifteen_minute().unwrap().cadence, Cadence::FifteenMinute);
    }

    #[test]
    fn test_miri_wheels_use_own_supply() {
        let config = miri_daily().unwrap();
        let gw23 = config
            .nominal_wheels
            .iter()
            .find(|w| w.ratio == "IMIR_HK_GW23_POS_RATIO")
            .unwrap();
        assert_eq!(gw23.validity[0].mnemonic, "IMIR_HK_GW23_POS_VOLT");
        assert_eq!(gw23.nominals["SHORT"], 619.81);
    }

    fn continuous_tables(config: &TrendingConfig) -> Vec<String> {
        config
            .groups
            .iter()
            .flat_map(|g| g.targets.iter().map(|t| g.table_for(t).to_string()))
            .chain(config.unconditioned.iter().cloned())
            .collect()
    }

    #[test]
    fn test_miri_ice_tables_split_by_cadence() {
        let daily = continuous_tables(&miri_daily().unwrap());
        let fifteen = continuous_tables(&miri_fifteen_minute().unwrap());

        assert!(daily.contains(&"SE_ZIMIRICEA_HV_ON".to_string()));
        assert!(daily.contains(&"IMIR_HK_ICE_SEC_VOLT4_HV_ON".to_string()));
        assert!(daily.contains(&"IMIR_HK_ICE_SEC_VOLT1".to_string()));
        assert!(fifteen.contains(&"SE_ZIMIRICEA_IDLE".to_string()));
        assert!(fifteen.contains(&"IMIR_HK_ICE_SEC_VOLT4_IDLE".to_string()));
        assert!(daily.iter().all(|t| !fifteen.contains(t)));
    }

    #[test]
    fn test_miri_daily_reduces_wheel_supplies() {
        let config = miri_daily().unwrap();
        for wheel in MIRI_WHEELS {
            let supply = format!("IMIR_HK_{wheel}_POS_VOLT");
            let group = config
                .groups
                .iter()
                .find(|g| g.targets == [supply.clone()])
                .unwrap();
            assert_eq!(group.conditions, vec![above(&supply, 250.0)]);
        }
    }

    #[test]
    fn test_miri_detectors_ready_targets() {
        let config = miri_fifteen_minute().unwrap();
        let group = config.groups.iter().find(|g| g.name == "detectors ready").unwrap();

        assert_eq!(group.targets.len(), 37);
        for target in [
            "SE_ZIMIRFPEA",
            "IGDP_MIR_SW_V_VRSTOFF",
            "IGDP_MIR_LW_V_VP",
            "IGDP_MIR_IC_V_VDDUC",
            "IGDP_MIR_SW_DET_TEMP",
        ] {
            assert!(group.targets.iter().any(|t| t == target), "{target}");
        }
    }

    #[test]
    fn test_nirspec_lamp_ignores_placeholders() {
        let config = nirspec_daily().unwrap();
        assert_eq!(config.lamps.len(), 1);
        assert_eq!(config.lamps[0].ignored_labels, vec!["NO_LAMP", "DUMMY"]);
        assert_eq!(config.wheels.len(), 3);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(by_name("fgs_daily"), Err(crate::Error::Config(_))));
    }
}
