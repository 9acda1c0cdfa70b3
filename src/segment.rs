use tracing::debug;

use crate::catalog::{self, PERSONAS};
use crate::error::{EngineError, Result};
use crate::models::{Segment, SegmentCharacteristics, Segmentation};

pub const DEFAULT_SEGMENT_COUNT: usize = 4;

/// `n_segments` is accepted but the catalog always yields four personas.
pub fn segment_users<T>(users: &[T], n_segments: usize) -> Result<Segmentation> {
    if users.is_empty() {
        return Err(EngineError::Validation(
            "user_data must contain at least one user".to_string(),
        ));
    }
    if n_segments != DEFAULT_SEGMENT_COUNT {
        debug!(
            n_segments,
            "segment count is fixed at {DEFAULT_SEGMENT_COUNT}; ignoring requested value"
        );
    }

    let population = users.len();
    let segments = PERSONAS
        .iter()
        .map(|persona| Segment {
            segment_id: persona.id,
            name: persona.name,
            size: (population as f64 * persona.proportion).floor() as usize,
            characteristics: SegmentCharacteristics {
                engagement_score: persona.engagement_score,
                proficiency_level: persona.proficiency_level,
                adoption_stage: persona.adoption_stage,
            },
        })
        .collect::<Vec<_>>();

    let recommendations = segments
        .iter()
        .map(|segment| {
            let persona = catalog::persona(segment.segment_id);
            let items = persona
                .recommendations
                .iter()
                .map(|item| item.to_string())
                .collect();
            (segment.segment_id, items)
        })
        .collect();

    Ok(Segmentation {
        segments,
        recommendations,
    })
}
