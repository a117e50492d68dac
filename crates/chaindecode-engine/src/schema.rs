//! Batch schema adaptation.
//!
//! Incoming columns are renamed from the user's names to the canonical ones
//! via the configured alias map, then cast to raw bytes according to the
//! configured physical encoding. On emission the decoder's
//! `output_hex_string_encoding` flag governs whether binary columns are
//! re-encoded as hex strings.

use crate::DecoderKind;
use crate::error::PipelineError;
use chaindecode_abi::dataframes;
use chaindecode_core::config::{ColumnEncoding, Config};
use indexmap::IndexMap;
use polars::prelude::*;

fn schema_maps(
    kind: DecoderKind,
    config: &Config,
) -> (&IndexMap<String, String>, &IndexMap<String, ColumnEncoding>) {
    match kind {
        DecoderKind::Log => (
            &config.log_decoder.log_schema.log_alias,
            &config.log_decoder.log_schema.log_datatype,
        ),
        DecoderKind::Trace => (
            &config.trace_decoder.trace_schema.trace_alias,
            &config.trace_decoder.trace_schema.trace_datatype,
        ),
    }
}

/// Rename aliased columns to canonical names and cast them to raw bytes.
pub fn normalize_input(
    df: &DataFrame,
    kind: DecoderKind,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let (alias, datatype) = schema_maps(kind, config);
    let mut out = df.clone();

    for (canonical, user) in alias {
        if out.column(user).is_err() {
            return Err(PipelineError::MissingColumn {
                column: user.clone(),
            });
        }
        if user != canonical {
            out.rename(user, canonical.as_str().into())?;
        }
    }

    for (canonical, encoding) in datatype {
        let dtype = out.column(canonical)?.dtype().clone();
        match encoding {
            ColumnEncoding::Binary => match dtype {
                DataType::Binary => {}
                // an all-null column carries no type information; make it binary
                DataType::Null => {
                    let cast = out.column(canonical)?.cast(&DataType::Binary)?;
                    out.replace(canonical, cast.as_materialized_series().clone())?;
                }
                other => {
                    return Err(PipelineError::Cast {
                        column: canonical.clone(),
                        reason: format!("expected Binary, found {other}"),
                    })
                }
            },
            ColumnEncoding::HexString => {
                let column = out.column(canonical)?;
                let ca = column.str().map_err(|_| PipelineError::Cast {
                    column: canonical.clone(),
                    reason: format!("expected String (hex), found {dtype}"),
                })?;
                let decoded =
                    dataframes::hex_decode_strings(ca, canonical).map_err(|e| {
                        PipelineError::Cast {
                            column: canonical.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                out.replace(canonical, decoded)?;
            }
        }
    }
    Ok(out)
}

/// Re-encode binary output columns as hex strings when configured.
pub fn encode_output(df: DataFrame, config: &Config) -> Result<DataFrame, PipelineError> {
    if config.decoder.output_hex_string_encoding {
        Ok(dataframes::encode_binary_columns(&df)?)
    } else {
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaindecode_core::config::ConfigValue;

    fn binary_series(name: &str, rows: &[Option<&[u8]>]) -> Series {
        let mut builder = BinaryChunkedBuilder::new(name.into(), rows.len());
        for row in rows {
            match row {
                Some(bytes) => builder.append_value(bytes),
                None => builder.append_null(),
            }
        }
        builder.finish().into_series()
    }

    fn raw_log_df() -> DataFrame {
        let topic = [0xabu8; 32];
        DataFrame::new(vec![
            binary_series("topic0", &[Some(&topic)]).into_column(),
            binary_series("topic1", &[None]).into_column(),
            binary_series("topic2", &[None]).into_column(),
            binary_series("topic3", &[None]).into_column(),
            binary_series("data", &[Some(&[0u8; 32])]).into_column(),
            binary_series("address", &[Some(&[0x11u8; 20])]).into_column(),
        ])
        .unwrap()
    }

    #[test]
    fn identity_schema_passes_through() {
        let df = raw_log_df();
        let out = normalize_input(&df, DecoderKind::Log, &Config::default()).unwrap();
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn aliased_columns_are_renamed() {
        let mut df = raw_log_df();
        df.rename("topic0", "t0".into()).unwrap();
        let mut config = Config::default();
        config
            .apply("log_decoder.log_schema.log_alias.topic0", &"t0".into())
            .unwrap();
        let out = normalize_input(&df, DecoderKind::Log, &config).unwrap();
        assert!(out.column("topic0").is_ok());
        assert!(out.column("t0").is_err());
    }

    #[test]
    fn hex_string_columns_are_decoded() {
        let mut df = raw_log_df();
        df.replace(
            "data",
            Series::new("data".into(), vec![Some("0xdeadbeef".to_string())]),
        )
        .unwrap();
        let mut config = Config::default();
        config
            .apply(
                "log_decoder.log_schema.log_datatype.data",
                &ConfigValue::Str("HexString".into()),
            )
            .unwrap();
        let out = normalize_input(&df, DecoderKind::Log, &config).unwrap();
        let data = out.column("data").unwrap().binary().unwrap();
        assert_eq!(data.get(0), Some(&[0xdeu8, 0xad, 0xbe, 0xef][..]));
    }

    #[test]
    fn missing_alias_column_is_an_error() {
        let df = raw_log_df().drop("topic3").unwrap();
        assert!(matches!(
            normalize_input(&df, DecoderKind::Log, &Config::default()),
            Err(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn wrong_dtype_is_a_cast_error() {
        let mut df = raw_log_df();
        df.replace("data", Series::new("data".into(), vec![1i64])).unwrap();
        assert!(matches!(
            normalize_input(&df, DecoderKind::Log, &Config::default()),
            Err(PipelineError::Cast { .. })
        ));
    }
}
