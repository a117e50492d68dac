//! Dataframe helpers shared by the catalog writer and the decode pipeline.

use polars::prelude::*;

/// Re-encode every binary column of `df` as 0x-prefixed hex strings.
/// Non-binary columns pass through untouched; nulls stay null.
pub fn encode_binary_columns(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    let binary_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::Binary)
        .map(|c| c.name().to_string())
        .collect();
    for name in binary_columns {
        let ca = out.column(&name)?.binary()?;
        let encoded = hex_encode_binary(ca, &name);
        out.replace(&name, encoded)?;
    }
    Ok(out)
}

/// Hex-encode one binary chunked array into a string series.
pub fn hex_encode_binary(ca: &BinaryChunked, name: &str) -> Series {
    let mut builder = StringChunkedBuilder::new(name.into(), ca.len());
    for value in ca.into_iter() {
        match value {
            Some(bytes) => builder.append_value(&format!("0x{}", hex::encode(bytes))),
            None => builder.append_null(),
        }
    }
    builder.finish().into_series()
}

/// Decode a 0x-prefixed hex string series into binary. Invalid hex becomes
/// an error carrying the offending row.
pub fn hex_decode_strings(ca: &StringChunked, name: &str) -> PolarsResult<Series> {
    let mut builder = BinaryChunkedBuilder::new(name.into(), ca.len());
    for (row, value) in ca.into_iter().enumerate() {
        match value {
            Some(s) => {
                let stripped = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(stripped).map_err(|e| {
                    polars_err!(ComputeError: "row {} of '{}' is not valid hex: {}", row, name, e)
                })?;
                builder.append_value(&bytes);
            }
            None => builder.append_null(),
        }
    }
    Ok(builder.finish().into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_columns_become_hex() {
        let mut builder = BinaryChunkedBuilder::new("raw".into(), 2);
        builder.append_value(&[0xde, 0xad]);
        builder.append_null();
        let df = DataFrame::new(vec![
            builder.finish().into_series().into_column(),
            Series::new("label".into(), vec!["a", "b"]).into_column(),
        ])
        .unwrap();

        let out = encode_binary_columns(&df).unwrap();
        let raw = out.column("raw").unwrap().str().unwrap();
        assert_eq!(raw.get(0), Some("0xdead"));
        assert_eq!(raw.get(1), None);
        // non-binary column untouched
        assert_eq!(out.column("label").unwrap().str().unwrap().get(0), Some("a"));
    }

    #[test]
    fn hex_round_trip() {
        let strings = StringChunked::new("x".into(), &[Some("0xbeef"), None]);
        let binary = hex_decode_strings(&strings, "x").unwrap();
        let back = hex_encode_binary(binary.binary().unwrap(), "x");
        assert_eq!(back.str().unwrap().get(0), Some("0xbeef"));
        assert_eq!(back.str().unwrap().get(1), None);
    }

    #[test]
    fn invalid_hex_is_an_error() {
        let strings = StringChunked::new("x".into(), &[Some("zz")]);
        assert!(hex_decode_strings(&strings, "x").is_err());
    }
}
