use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Emotion labels recognised by the classifier.
///
/// Declaration order matches the FER+ output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Surprise,
    Sad,
    Angry,
    Disgust,
    Fear,
    Contempt,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Surprise,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Contempt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Surprise => "surprise",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Contempt => "contempt",
        }
    }

    /// TMDB genre id recommended for this mood, if there is one.
    pub fn genre_id(&self) -> Option<u32> {
        match self {
            Emotion::Happy => Some(35),     // Comedy
            Emotion::Sad => Some(18),       // Drama
            Emotion::Angry => Some(28),     // Action
            Emotion::Fear => Some(27),      // Horror
            Emotion::Surprise => Some(878), // Science Fiction
            Emotion::Neutral => Some(10749), // Romance
            Emotion::Disgust | Emotion::Contempt => None,
        }
    }

    /// Every emotion that maps to a genre, paired with its genre id.
    pub fn genre_map() -> Vec<(Emotion, u32)> {
        Self::ALL
            .iter()
            .filter_map(|e| e.genre_id().map(|id| (*e, id)))
            .collect()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// Per-emotion probabilities produced by the classifier (sum to 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub neutral: f32,
    pub happy: f32,
    pub surprise: f32,
    pub sad: f32,
    pub angry: f32,
    pub disgust: f32,
    pub fear: f32,
    pub contempt: f32,
}

impl EmotionScores {
    /// Build scores from raw FER+ logits via a numerically stable softmax.
    ///
    /// Returns `None` unless exactly one logit per emotion is given.
    pub fn from_logits(logits: &[f32]) -> Option<Self> {
        if logits.len() != Emotion::ALL.len() {
            return None;
        }

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        let mut scores = Self::default();
        for (emotion, e) in Emotion::ALL.iter().zip(exps) {
            *scores.get_mut(*emotion) = if sum > 0.0 { e / sum } else { 0.0 };
        }
        Some(scores)
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Neutral => self.neutral,
            Emotion::Happy => self.happy,
            Emotion::Surprise => self.surprise,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Disgust => self.disgust,
            Emotion::Fear => self.fear,
            Emotion::Contempt => self.contempt,
        }
    }

    fn get_mut(&mut self, emotion: Emotion) -> &mut f32 {
        match emotion {
            Emotion::Neutral => &mut self.neutral,
            Emotion::Happy => &mut self.happy,
            Emotion::Surprise => &mut self.surprise,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Disgust => &mut self.disgust,
            Emotion::Fear => &mut self.fear,
            Emotion::Contempt => &mut self.contempt,
        }
    }

    /// Highest-probability emotion. Ties go to the earlier label.
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        let mut best_score = self.get(best);
        for emotion in Emotion::ALL.iter().skip(1) {
            let score = self.get(*emotion);
            if score > best_score {
                best = *emotion;
                best_score = score;
            }
        }
        best
    }
}

/// Error text reported when an image contains no detectable face.
pub const NO_FACE_MESSAGE: &str = "Face not detected";

/// Outcome of running detection and classification on one image.
#[derive(Debug, Clone)]
pub enum Analysis {
    NoFace,
    Detected {
        emotion: Emotion,
        scores: EmotionScores,
        face: BoundingBox,
    },
}

impl Analysis {
    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            Analysis::NoFace => None,
            Analysis::Detected { emotion, .. } => Some(*emotion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_face_analysis() {
        assert!(Analysis::NoFace.emotion().is_none());
        // Clients match on this exact string.
        assert_eq!(NO_FACE_MESSAGE, "Face not detected");
    }

    #[test]
    fn test_emotion_serializes_lowercase() {
        let json = serde_json::to_string(&Emotion::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
        let back: Emotion = serde_json::from_str("\"angry\"").unwrap();
        assert_eq!(back, Emotion::Angry);
    }

    #[test]
    fn test_emotion_from_str() {
        assert_eq!("Happy".parse::<Emotion>().unwrap(), Emotion::Happy);
        assert!("bored".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_genre_map() {
        assert_eq!(Emotion::Happy.genre_id(), Some(35));
        assert_eq!(Emotion::Sad.genre_id(), Some(18));
        assert_eq!(Emotion::Angry.genre_id(), Some(28));
        assert_eq!(Emotion::Fear.genre_id(), Some(27));
        assert_eq!(Emotion::Surprise.genre_id(), Some(878));
        assert_eq!(Emotion::Neutral.genre_id(), Some(10749));
        assert_eq!(Emotion::Disgust.genre_id(), None);
        assert_eq!(Emotion::genre_map().len(), 6);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let logits = [0.5, 3.0, -1.0, 0.0, 1.0, -2.0, 0.2, -0.5];
        let scores = EmotionScores::from_logits(&logits).unwrap();
        let total: f32 = Emotion::ALL.iter().map(|e| scores.get(*e)).sum();
        assert!((total - 1.0).abs() < 1e-5, "total = {total}");
        assert_eq!(scores.dominant(), Emotion::Happy);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let logits = [1000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1001.0];
        let scores = EmotionScores::from_logits(&logits).unwrap();
        assert!(scores.contempt.is_finite());
        assert_eq!(scores.dominant(), Emotion::Contempt);
    }

    #[test]
    fn test_from_logits_wrong_length() {
        assert!(EmotionScores::from_logits(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_dominant_tie_prefers_first() {
        let scores = EmotionScores {
            sad: 0.5,
            fear: 0.5,
            ..Default::default()
        };
        assert_eq!(scores.dominant(), Emotion::Sad);
    }

    #[test]
    fn test_analysis_emotion() {
        assert_eq!(Analysis::NoFace.emotion(), None);
        let detected = Analysis::Detected {
            emotion: Emotion::Fear,
            scores: EmotionScores::default(),
            face: BoundingBox {
                x: 0.0, y: 0.0, width: 10.0, height: 10.0,
                confidence: 0.9, landmarks: None,
            },
        };
        assert_eq!(detected.emotion(), Some(Emotion::Fear));
    }
}
