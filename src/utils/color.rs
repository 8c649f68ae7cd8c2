use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use core::str::FromStr;

use angular_units::Deg;
use prisma::FromColor;
use prisma::Hsv;
use prisma::Rgb;
use rand::Rng;
use schemars::JsonSchema;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;

use crate::errors::CommandError;

/// A display color for a map layer, written as a `#RRGGBB` hex string.
#[derive(Clone,Copy,Debug,PartialEq)]
pub(crate) struct LayerColor(Rgb<u8>);

impl LayerColor {

    pub(crate) fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(Rgb::new(red,green,blue))
    }

    pub(crate) fn try_from_hex_str(value: &str) -> Result<Self,CommandError> {
        if !value.starts_with('#') || value.len() != 7 {
            return Err(CommandError::InvalidValueForColor(value.to_owned(),"Expected '#' followed by six hex digits.".to_owned()))
        }
        let mut colors = (1..=5).step_by(2).map(|n| {
            value.get(n..(n+2)).and_then(|part| u8::from_str_radix(part, 16).ok())
        });
        let red = colors.next().flatten().ok_or_else(|| CommandError::InvalidValueForColor(value.to_owned(),"Invalid red.".to_owned()))?;
        let green = colors.next().flatten().ok_or_else(|| CommandError::InvalidValueForColor(value.to_owned(),"Invalid green.".to_owned()))?;
        let blue = colors.next().flatten().ok_or_else(|| CommandError::InvalidValueForColor(value.to_owned(),"Invalid blue.".to_owned()))?;
        Ok(Self::from_rgb(red,green,blue))
    }

    /// A random, reasonably saturated color which stands out against a base map.
    pub(crate) fn random<Random: Rng>(rng: &mut Random) -> Self {
        let hue = Deg(rng.gen_range(0.0..360.0));
        let saturation = rng.gen_range(0.55..0.95);
        let value = rng.gen_range(0.55..0.9);
        let hsv: Hsv<f32,Deg<f32>> = Hsv::new(hue,saturation,value);
        Self(Rgb::from_color(&hsv).color_cast())
    }
}

impl Display for LayerColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let (red,green,blue) = (self.0.red(),self.0.green(),self.0.blue());
        write!(f,"#{red:02X?}{green:02X?}{blue:02X?}")
    }
}

impl FromStr for LayerColor {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_hex_str(s)
    }
}

impl Serialize for LayerColor {
    fn serialize<SerializerType: Serializer>(&self, serializer: SerializerType) -> Result<SerializerType::Ok, SerializerType::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LayerColor {
    fn deserialize<DeserializerType: Deserializer<'de>>(deserializer: DeserializerType) -> Result<Self, DeserializerType::Error> {
        let text = String::deserialize(deserializer)?;
        Self::try_from_hex_str(&text).map_err(DeserializerType::Error::custom)
    }
}

impl JsonSchema for LayerColor {
    fn schema_name() -> String {
        "LayerColor".to_owned()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

#[cfg(test)]
mod test {

    use rand::rngs::StdRng;
    use rand::SeedableRng as _;

    use super::LayerColor;

    #[test]
    fn test_hex_colors() {
        let color = LayerColor::try_from_hex_str("#2563eb").unwrap();
        assert_eq!(color,LayerColor::from_rgb(0x25,0x63,0xeb));
        assert_eq!(color.to_string(),"#2563EB");
        assert!(LayerColor::try_from_hex_str("2563eb").is_err());
        assert!(LayerColor::try_from_hex_str("#25zz00").is_err());
        assert!(LayerColor::try_from_hex_str("#2563").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let color: LayerColor = serde_json::from_str("\"#ff0000\"").unwrap();
        assert_eq!(serde_json::to_string(&color).unwrap(),"\"#FF0000\"");
    }

    #[test]
    fn test_random_colors_are_repeatable() {
        let first = LayerColor::random(&mut StdRng::seed_from_u64(7));
        let second = LayerColor::random(&mut StdRng::seed_from_u64(7));
        assert_eq!(first,second);
    }
}
