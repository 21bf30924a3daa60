use crate::coords::ConvertError;

/// Split a sexagesimal string (`12:30:45.5`, `12h30m45.5s`, `-45d30m00s`) into three numbers.
fn split_sexagesimal(input: &str) -> Result<(f64, f64, f64), ConvertError> {
    let invalid = || ConvertError::InvalidAngle(input.to_string());

    let cleaned = input
        .chars()
        .map(|c| match c {
            'h' | 'd' | 'm' | 's' | ':' | '\'' | '"' => ' ',
            c => c,
        })
        .collect::<String>();

    let parts = cleaned
        .split_whitespace()
        .map(|part| part.parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<f64>, ConvertError>>()?;

    match parts.as_slice() {
        [a, m, s] if (0.0..60.0).contains(m) && (0.0..60.0).contains(s) => Ok((*a, *m, *s)),
        _ => Err(invalid()),
    }
}

/// Parse a right ascension into radians.
///
/// Accepts hours in sexagesimal notation (`hh:mm:ss.s`, `hhhmmmss.ss`) or plain decimal degrees.
pub fn parse_ra(input: &str) -> Result<f64, ConvertError> {
    let raw = input.trim().to_lowercase();

    if let Ok(degrees) = raw.parse::<f64>() {
        return Ok(degrees.to_radians());
    }

    let (h, m, s) = split_sexagesimal(&raw)?;

    Ok(((h + m / 60.0 + s / 3600.0) * 15.0).to_radians())
}

/// Parse a declination into radians.
///
/// Accepts degrees in sexagesimal notation (`±dd:mm:ss.s`, `±ddDmmMss.ss`) or plain decimal
/// degrees.
pub fn parse_dec(input: &str) -> Result<f64, ConvertError> {
    let raw = input.trim().to_lowercase();

    if let Ok(degrees) = raw.parse::<f64>() {
        return Ok(degrees.to_radians());
    }

    let sign = if raw.starts_with('-') { -1.0 } else { 1.0 };
    let (d, m, s) = split_sexagesimal(raw.trim_start_matches(['+', '-']))?;

    Ok((sign * (d + m / 60.0 + s / 3600.0)).to_radians())
}
