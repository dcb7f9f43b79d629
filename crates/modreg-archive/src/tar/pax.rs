//! PAX extended header records: `"<len> <key>=<value>\n"`.

use crate::error::TarError;

/// Header field overrides collected from PAX (or GNU long-name) records.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Overrides<'a> {
    pub path: Option<&'a [u8]>,
    pub linkpath: Option<&'a [u8]>,
    pub size: Option<u64>,
}

impl<'a> Overrides<'a> {
    /// Entry-local values win; missing ones fall back to `globals`.
    pub fn or(self, globals: Overrides<'a>) -> Overrides<'a> {
        Overrides {
            path: self.path.or(globals.path),
            linkpath: self.linkpath.or(globals.linkpath),
            size: self.size.or(globals.size),
        }
    }
}

/// Parses every record in `data`, folding recognized keys into `into`.
///
/// `offset` is the absolute position of `data` in the archive and is only
/// used for error reporting.
pub(crate) fn parse_records<'a>(
    mut data: &'a [u8],
    mut offset: usize,
    into: &mut Overrides<'a>,
) -> Result<(), TarError> {
    while !data.is_empty() {
        // Some writers pad the record area with NULs.
        if data.iter().all(|&b| b == 0) {
            break;
        }

        let invalid = |reason: &str| {
            TarError::InvalidPaxRecord {
                offset,
                reason: reason.to_string(),
            }
        };

        let space = data
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| invalid("missing length separator"))?;
        let len = std::str::from_utf8(&data[..space])
            .ok()
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| invalid("bad record length"))?;

        if len <= space + 1 || len > data.len() {
            return Err(invalid("record length out of range"));
        }

        let record = &data[..len];
        if record[len - 1] != b'\n' {
            return Err(invalid("record not newline terminated"));
        }

        let body = &record[space + 1..len - 1];
        let eq = body
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| invalid("missing `=`"))?;
        let (key, value) = (&body[..eq], &body[eq + 1..]);

        match key {
            b"path" => into.path = Some(value),
            b"linkpath" => into.linkpath = Some(value),
            b"size" => {
                let size = std::str::from_utf8(value)
                    .ok()
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .ok_or_else(|| {
                        TarError::InvalidNumber {
                            field: "pax size",
                            offset,
                            value: String::from_utf8_lossy(value).into_owned(),
                        }
                    })?;
                into.size = Some(size);
            }
            _ => {}
        }

        data = &data[len..];
        offset += len;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn record(key: &str, value: &str) -> String {
    // The length prefix counts its own digits.
    let base = key.len() + value.len() + 3;
    let mut len = base + 1;
    while len != base + len.to_string().len() {
        len = base + len.to_string().len();
    }
    format!("{len} {key}={value}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_helper_lengths() {
        assert_eq!(record("path", "a"), "9 path=a\n");
        let long = "x".repeat(95);
        let rec = record("path", &long);
        assert_eq!(rec.len(), rec.split(' ').next().unwrap().parse::<usize>().unwrap());
    }

    #[test]
    fn test_parse_known_keys() {
        let data = format!(
            "{}{}{}{}",
            record("path", "a/b/long-name.txt"),
            record("mtime", "1700000000.5"),
            record("linkpath", "target"),
            record("size", "1234"),
        );
        let mut overrides = Overrides::default();
        parse_records(data.as_bytes(), 512, &mut overrides).unwrap();

        assert_eq!(overrides.path, Some(&b"a/b/long-name.txt"[..]));
        assert_eq!(overrides.linkpath, Some(&b"target"[..]));
        assert_eq!(overrides.size, Some(1234));
    }

    #[test]
    fn test_value_may_contain_equals_and_spaces() {
        let data = record("path", "dir with space/a=b");
        let mut overrides = Overrides::default();
        parse_records(data.as_bytes(), 0, &mut overrides).unwrap();
        assert_eq!(overrides.path, Some(&b"dir with space/a=b"[..]));
    }

    #[test]
    fn test_trailing_nul_padding_ignored() {
        let mut data = record("path", "x").into_bytes();
        data.extend_from_slice(&[0; 20]);
        let mut overrides = Overrides::default();
        parse_records(&data, 0, &mut overrides).unwrap();
        assert_eq!(overrides.path, Some(&b"x"[..]));
    }

    #[test]
    fn test_malformed_records() {
        let cases: [&[u8]; 5] = [
            b"path=a\n",
            b"xx path=a\n",
            b"99 path=a\n",
            b"9 path=ab",
            b"8 patha\n",
        ];
        for data in cases {
            let mut overrides = Overrides::default();
            let result = parse_records(data, 0, &mut overrides);
            assert!(
                matches!(result, Err(TarError::InvalidPaxRecord { .. })),
                "{:?}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_bad_size_value() {
        let data = record("size", "12k");
        let mut overrides = Overrides::default();
        let result = parse_records(data.as_bytes(), 0, &mut overrides);
        assert!(matches!(result, Err(TarError::InvalidNumber { .. })));
    }

    #[test]
    fn test_local_overrides_win_over_globals() {
        let globals = Overrides {
            path: Some(&b"global"[..]),
            linkpath: Some(&b"global-link"[..]),
            size: None,
        };
        let local = Overrides {
            path: Some(&b"local"[..]),
            ..Overrides::default()
        };
        let merged = local.or(globals);
        assert_eq!(merged.path, Some(&b"local"[..]));
        assert_eq!(merged.linkpath, Some(&b"global-link"[..]));
        assert_eq!(merged.size, None);
    }
}
