/// Room temperature in kelvin. Fresh solutions start at this temperature.
pub const ROOM_TEMPERATURE: f32 = 293.15;

/// Offset between the kelvin and celsius scales.
pub const CELSIUS_OFFSET: f32 = 273.15;

/// Convert an absolute temperature to degrees celsius for display.
pub fn kelvin_to_celsius(kelvin: f32) -> f32 {
    kelvin - CELSIUS_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_temperature_is_twenty_celsius() {
        assert!((kelvin_to_celsius(ROOM_TEMPERATURE) - 20.0).abs() < 1e-4);
    }
}
