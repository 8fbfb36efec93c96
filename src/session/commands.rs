//! Line commands for the interactive session.
//!
//! ```text
//! start 2021-01-01
//! end 2021-02-01
//! rect 76.8 12.9 76.9 13.0
//! polygon 76.8,12.9 76.9,12.9 76.9,13.0
//! point 76.85 12.95
//! geojson {"type":"Point","coordinates":[76.85,12.95]}
//! clear
//! quit
//! ```

use super::Edit;
use crate::region::Region;

/// A parsed session input line.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Edit(Edit),
    Help,
    Quit,
}

/// Usage text printed for `help` and unknown commands.
pub const USAGE: &str = "\
Commands:
  start YYYY-MM-DD                 set the start date (inclusive)
  end YYYY-MM-DD                   set the end date (exclusive)
  rect MINLON MINLAT MAXLON MAXLAT draw a rectangle (replaces the region)
  polygon LON,LAT LON,LAT ...      draw a polygon, at least 3 vertices
  point LON LAT                    use a single point
  geojson {...}                    use a GeoJSON geometry
  clear                            remove the region
  help                             show this text
  quit                             leave the session";

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb.to_lowercase().as_str() {
        "start" => SessionCommand::Edit(Edit::SetStart(single_arg(verb, rest)?)),
        "end" => SessionCommand::Edit(Edit::SetEnd(single_arg(verb, rest)?)),
        "rect" | "rectangle" => {
            let v = numbers(rest)?;
            match v.as_slice() {
                [a, b, c, d] => SessionCommand::Edit(Edit::SetRegion(Region::rectangle(*a, *b, *c, *d))),
                _ => return Err("rect needs 4 numbers: MINLON MINLAT MAXLON MAXLAT".to_string()),
            }
        }
        "polygon" | "poly" => {
            let ring = rest
                .split_whitespace()
                .map(|pair| match numbers(pair)?.as_slice() {
                    [lon, lat] => Ok((*lon, *lat)),
                    _ => Err(format!("invalid vertex '{}', expected LON,LAT", pair)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if ring.len() < 3 {
                return Err("polygon needs at least 3 vertices".to_string());
            }
            SessionCommand::Edit(Edit::SetRegion(Region::Polygon { ring }))
        }
        "point" => match numbers(rest)?.as_slice() {
            [lon, lat] => SessionCommand::Edit(Edit::SetRegion(Region::Point { lon: *lon, lat: *lat })),
            _ => return Err("point needs 2 numbers: LON LAT".to_string()),
        },
        "geojson" => {
            let region = Region::from_geojson(rest).map_err(|e| e.to_string())?;
            SessionCommand::Edit(Edit::SetRegion(region))
        }
        "clear" => SessionCommand::Edit(Edit::ClearRegion),
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };

    Ok(Some(command))
}

fn single_arg(verb: &str, rest: &str) -> Result<String, String> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(format!("{} needs exactly one argument", verb));
    }
    Ok(rest.to_string())
}

/// Numbers separated by whitespace and/or commas.
fn numbers(text: &str) -> Result<Vec<f64>, String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| format!("'{}' is not a number", s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(line: &str) -> Edit {
        match parse_command(line) {
            Ok(Some(SessionCommand::Edit(edit))) => edit,
            other => panic!("expected edit for '{}', got {:?}", line, other),
        }
    }

    #[test]
    fn test_dates() {
        assert_eq!(edit("start 2021-01-01"), Edit::SetStart("2021-01-01".to_string()));
        assert_eq!(edit("  END   2021-02-01 "), Edit::SetEnd("2021-02-01".to_string()));
        assert!(parse_command("start").is_err());
        assert!(parse_command("start 2021-01-01 2021-01-02").is_err());
    }

    #[test]
    fn test_rectangle() {
        assert_eq!(
            edit("rect 10 5 0 -5"),
            Edit::SetRegion(Region::rectangle(0.0, -5.0, 10.0, 5.0))
        );
        assert_eq!(
            edit("rectangle 0,0,1,1"),
            Edit::SetRegion(Region::rectangle(0.0, 0.0, 1.0, 1.0))
        );
        assert!(parse_command("rect 1 2 3").is_err());
        assert!(parse_command("rect a b c d").is_err());
    }

    #[test]
    fn test_polygon() {
        assert_eq!(
            edit("polygon 0,0 1,0 1,1"),
            Edit::SetRegion(Region::Polygon {
                ring: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
            })
        );
        assert!(parse_command("polygon 0,0 1,1").is_err());
        assert!(parse_command("polygon 0,0 1 1,1").is_err());
    }

    #[test]
    fn test_point_and_geojson() {
        assert_eq!(
            edit("point 76.85 12.95"),
            Edit::SetRegion(Region::Point { lon: 76.85, lat: 12.95 })
        );
        assert_eq!(
            edit(r#"geojson {"type":"Point","coordinates":[1.5,2.5]}"#),
            Edit::SetRegion(Region::Point { lon: 1.5, lat: 2.5 })
        );
        assert!(parse_command("geojson {not json").is_err());
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(edit("clear"), Edit::ClearRegion);
        assert_eq!(parse_command("help"), Ok(Some(SessionCommand::Help)));
        assert_eq!(parse_command("quit"), Ok(Some(SessionCommand::Quit)));
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("# comment"), Ok(None));
        assert!(parse_command("draw").is_err());
    }
}
