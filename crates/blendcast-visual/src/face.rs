//! Face State - Facial expression coefficients
//!
//! A tracker reports one coefficient in [0, 1] per blendshape on every
//! update. The key set is closed and its order is canonical: records
//! are laid out in exactly this order.

use std::fmt;

use blendcast_core::{BlendcastError, BlendcastResult};

/// ARKit blendshape keys, in canonical record order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendShape {
    BrowDownLeft,
    BrowDownRight,
    BrowInnerUp,
    BrowOuterUpLeft,
    BrowOuterUpRight,
    CheekPuff,
    CheekSquintLeft,
    CheekSquintRight,
    EyeBlinkLeft,
    EyeBlinkRight,
    EyeLookDownLeft,
    EyeLookDownRight,
    EyeLookInLeft,
    EyeLookInRight,
    EyeLookOutLeft,
    EyeLookOutRight,
    EyeLookUpLeft,
    EyeLookUpRight,
    EyeSquintLeft,
    EyeSquintRight,
    EyeWideLeft,
    EyeWideRight,
    JawForward,
    JawLeft,
    JawOpen,
    JawRight,
    MouthClose,
    MouthDimpleLeft,
    MouthDimpleRight,
    MouthFrownLeft,
    MouthFrownRight,
    MouthFunnel,
    MouthLeft,
    MouthLowerDownLeft,
    MouthLowerDownRight,
    MouthPressLeft,
    MouthPressRight,
    MouthPucker,
    MouthRight,
    MouthRollLower,
    MouthRollUpper,
    MouthShrugLower,
    MouthShrugUpper,
    MouthSmileLeft,
    MouthSmileRight,
    MouthStretchLeft,
    MouthStretchRight,
    MouthUpperUpLeft,
    MouthUpperUpRight,
    NoseSneerLeft,
    NoseSneerRight,
    TongueOut,
}

impl BlendShape {
    /// Number of keys
    pub const COUNT: usize = 52;

    /// All keys in canonical order
    pub const ALL: [BlendShape; BlendShape::COUNT] = [
        BlendShape::BrowDownLeft,
        BlendShape::BrowDownRight,
        BlendShape::BrowInnerUp,
        BlendShape::BrowOuterUpLeft,
        BlendShape::BrowOuterUpRight,
        BlendShape::CheekPuff,
        BlendShape::CheekSquintLeft,
        BlendShape::CheekSquintRight,
        BlendShape::EyeBlinkLeft,
        BlendShape::EyeBlinkRight,
        BlendShape::EyeLookDownLeft,
        BlendShape::EyeLookDownRight,
        BlendShape::EyeLookInLeft,
        BlendShape::EyeLookInRight,
        BlendShape::EyeLookOutLeft,
        BlendShape::EyeLookOutRight,
        BlendShape::EyeLookUpLeft,
        BlendShape::EyeLookUpRight,
        BlendShape::EyeSquintLeft,
        BlendShape::EyeSquintRight,
        BlendShape::EyeWideLeft,
        BlendShape::EyeWideRight,
        BlendShape::JawForward,
        BlendShape::JawLeft,
        BlendShape::JawOpen,
        BlendShape::JawRight,
        BlendShape::MouthClose,
        BlendShape::MouthDimpleLeft,
        BlendShape::MouthDimpleRight,
        BlendShape::MouthFrownLeft,
        BlendShape::MouthFrownRight,
        BlendShape::MouthFunnel,
        BlendShape::MouthLeft,
        BlendShape::MouthLowerDownLeft,
        BlendShape::MouthLowerDownRight,
        BlendShape::MouthPressLeft,
        BlendShape::MouthPressRight,
        BlendShape::MouthPucker,
        BlendShape::MouthRight,
        BlendShape::MouthRollLower,
        BlendShape::MouthRollUpper,
        BlendShape::MouthShrugLower,
        BlendShape::MouthShrugUpper,
        BlendShape::MouthSmileLeft,
        BlendShape::MouthSmileRight,
        BlendShape::MouthStretchLeft,
        BlendShape::MouthStretchRight,
        BlendShape::MouthUpperUpLeft,
        BlendShape::MouthUpperUpRight,
        BlendShape::NoseSneerLeft,
        BlendShape::NoseSneerRight,
        BlendShape::TongueOut,
    ];

    /// The 51 keys of the original ARKit face model (everything but
    /// `TongueOut`, which arrived later and is optional on input)
    pub fn classic() -> &'static [BlendShape] {
        &Self::ALL[..Self::COUNT - 1]
    }

    /// Whether a tracker must report this key
    #[inline]
    pub fn is_required(self) -> bool {
        self != BlendShape::TongueOut
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Tracker-side name (ARKit camelCase)
    pub fn name(self) -> &'static str {
        match self {
            BlendShape::BrowDownLeft => "browDownLeft",
            BlendShape::BrowDownRight => "browDownRight",
            BlendShape::BrowInnerUp => "browInnerUp",
            BlendShape::BrowOuterUpLeft => "browOuterUpLeft",
            BlendShape::BrowOuterUpRight => "browOuterUpRight",
            BlendShape::CheekPuff => "cheekPuff",
            BlendShape::CheekSquintLeft => "cheekSquintLeft",
            BlendShape::CheekSquintRight => "cheekSquintRight",
            BlendShape::EyeBlinkLeft => "eyeBlinkLeft",
            BlendShape::EyeBlinkRight => "eyeBlinkRight",
            BlendShape::EyeLookDownLeft => "eyeLookDownLeft",
            BlendShape::EyeLookDownRight => "eyeLookDownRight",
            BlendShape::EyeLookInLeft => "eyeLookInLeft",
            BlendShape::EyeLookInRight => "eyeLookInRight",
            BlendShape::EyeLookOutLeft => "eyeLookOutLeft",
            BlendShape::EyeLookOutRight => "eyeLookOutRight",
            BlendShape::EyeLookUpLeft => "eyeLookUpLeft",
            BlendShape::EyeLookUpRight => "eyeLookUpRight",
            BlendShape::EyeSquintLeft => "eyeSquintLeft",
            BlendShape::EyeSquintRight => "eyeSquintRight",
            BlendShape::EyeWideLeft => "eyeWideLeft",
            BlendShape::EyeWideRight => "eyeWideRight",
            BlendShape::JawForward => "jawForward",
            BlendShape::JawLeft => "jawLeft",
            BlendShape::JawOpen => "jawOpen",
            BlendShape::JawRight => "jawRight",
            BlendShape::MouthClose => "mouthClose",
            BlendShape::MouthDimpleLeft => "mouthDimpleLeft",
            BlendShape::MouthDimpleRight => "mouthDimpleRight",
            BlendShape::MouthFrownLeft => "mouthFrownLeft",
            BlendShape::MouthFrownRight => "mouthFrownRight",
            BlendShape::MouthFunnel => "mouthFunnel",
            BlendShape::MouthLeft => "mouthLeft",
            BlendShape::MouthLowerDownLeft => "mouthLowerDownLeft",
            BlendShape::MouthLowerDownRight => "mouthLowerDownRight",
            BlendShape::MouthPressLeft => "mouthPressLeft",
            BlendShape::MouthPressRight => "mouthPressRight",
            BlendShape::MouthPucker => "mouthPucker",
            BlendShape::MouthRight => "mouthRight",
            BlendShape::MouthRollLower => "mouthRollLower",
            BlendShape::MouthRollUpper => "mouthRollUpper",
            BlendShape::MouthShrugLower => "mouthShrugLower",
            BlendShape::MouthShrugUpper => "mouthShrugUpper",
            BlendShape::MouthSmileLeft => "mouthSmileLeft",
            BlendShape::MouthSmileRight => "mouthSmileRight",
            BlendShape::MouthStretchLeft => "mouthStretchLeft",
            BlendShape::MouthStretchRight => "mouthStretchRight",
            BlendShape::MouthUpperUpLeft => "mouthUpperUpLeft",
            BlendShape::MouthUpperUpRight => "mouthUpperUpRight",
            BlendShape::NoseSneerLeft => "noseSneerLeft",
            BlendShape::NoseSneerRight => "noseSneerRight",
            BlendShape::TongueOut => "tongueOut",
        }
    }

    /// Look a key up by its tracker-side name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|shape| shape.name() == name)
    }
}

impl fmt::Display for BlendShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tracker update worth of expression coefficients
#[derive(Clone, PartialEq)]
pub struct ExpressionFrame {
    coefficients: [f32; BlendShape::COUNT],
}

impl ExpressionFrame {
    /// Every coefficient at rest
    pub fn neutral() -> Self {
        ExpressionFrame {
            coefficients: [0.0; BlendShape::COUNT],
        }
    }

    /// Every coefficient set to `value`
    pub fn uniform(value: f32) -> Self {
        ExpressionFrame {
            coefficients: [value; BlendShape::COUNT],
        }
    }

    /// Build from tracker-side `(name, value)` pairs.
    ///
    /// All 51 classic keys must be present; `tongueOut` defaults to 0.0.
    /// Unknown names are rejected rather than silently dropped.
    pub fn from_named<'a, I>(pairs: I) -> BlendcastResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut seen = [false; BlendShape::COUNT];
        let mut frame = ExpressionFrame::neutral();

        for (name, value) in pairs {
            let shape = BlendShape::from_name(name)
                .ok_or_else(|| BlendcastError::UnknownBlendShape(name.to_string()))?;
            frame.coefficients[shape.index()] = value;
            seen[shape.index()] = true;
        }

        if let Some(missing) = BlendShape::ALL
            .iter()
            .find(|shape| shape.is_required() && !seen[shape.index()])
        {
            return Err(BlendcastError::MissingCoefficient(missing.name()));
        }

        Ok(frame)
    }

    #[inline]
    pub fn get(&self, shape: BlendShape) -> f32 {
        self.coefficients[shape.index()]
    }

    #[inline]
    pub fn set(&mut self, shape: BlendShape, value: f32) {
        self.coefficients[shape.index()] = value;
    }

    /// Builder-style `set`
    pub fn with(mut self, shape: BlendShape, value: f32) -> Self {
        self.set(shape, value);
        self
    }

    /// Coefficients in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (BlendShape, f32)> + '_ {
        BlendShape::ALL
            .iter()
            .map(move |shape| (*shape, self.coefficients[shape.index()]))
    }

    /// Strongest coefficient, if any is above zero
    pub fn dominant(&self) -> Option<(BlendShape, f32)> {
        self.iter()
            .filter(|(_, value)| *value > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl Default for ExpressionFrame {
    fn default() -> Self {
        Self::neutral()
    }
}

impl fmt::Debug for ExpressionFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dominant() {
            Some((shape, value)) => write!(f, "ExpressionFrame({}={:.3}, ..)", shape, value),
            None => f.write_str("ExpressionFrame(neutral)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic_pairs(value: f32) -> Vec<(&'static str, f32)> {
        BlendShape::classic()
            .iter()
            .map(|shape| (shape.name(), value))
            .collect()
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(BlendShape::ALL.len(), BlendShape::COUNT);
        assert_eq!(BlendShape::classic().len(), 51);
        for (i, shape) in BlendShape::ALL.iter().enumerate() {
            assert_eq!(shape.index(), i);
        }
        assert_eq!(BlendShape::ALL[0].name(), "browDownLeft");
        assert_eq!(BlendShape::classic()[50].name(), "noseSneerRight");
    }

    #[test]
    fn test_name_roundtrip() {
        for shape in BlendShape::ALL {
            assert_eq!(BlendShape::from_name(shape.name()), Some(shape));
        }
        assert_eq!(BlendShape::from_name("eyebrowWiggle"), None);
    }

    #[test]
    fn test_from_named_complete() {
        let frame = ExpressionFrame::from_named(classic_pairs(0.25)).unwrap();
        assert_eq!(frame.get(BlendShape::JawOpen), 0.25);
        assert_eq!(frame.get(BlendShape::TongueOut), 0.0);
    }

    #[test]
    fn test_from_named_missing_key() {
        let pairs: Vec<_> = classic_pairs(0.5)
            .into_iter()
            .filter(|(name, _)| *name != "jawOpen")
            .collect();

        let err = ExpressionFrame::from_named(pairs).unwrap_err();
        assert!(matches!(err, BlendcastError::MissingCoefficient("jawOpen")));
    }

    #[test]
    fn test_from_named_unknown_key() {
        let mut pairs = classic_pairs(0.5);
        pairs.push(("earWiggle", 1.0));

        let err = ExpressionFrame::from_named(pairs).unwrap_err();
        assert!(matches!(err, BlendcastError::UnknownBlendShape(name) if name == "earWiggle"));
    }

    #[test]
    fn test_dominant() {
        let frame = ExpressionFrame::neutral()
            .with(BlendShape::MouthSmileLeft, 0.4)
            .with(BlendShape::JawOpen, 0.9);
        assert_eq!(frame.dominant(), Some((BlendShape::JawOpen, 0.9)));
        assert_eq!(ExpressionFrame::neutral().dominant(), None);
    }
}
