//! Prompt construction for zone inspections.
//!
//! One fixed template per inspection, parameterised by the zone's
//! `personality` (opaque flavour text) and `pickiness` (1-5, mapped
//! monotonically to stricter wording). The reply contract matches what
//! [`crate::parser`] expects.

use crate::zone::ZoneConfig;

/// Strictness wording per pickiness level, index 0 = pickiness 1.
///
/// Ordered from most lenient to most strict; the mapping must stay
/// monotone so a higher pickiness never reads as more forgiving.
const STRICTNESS: [&str; 5] = [
    "Only report the room as messy when there is serious, obvious mess that clearly needs attention. Ignore minor clutter entirely.",
    "Report the room as messy only for noticeable clutter. Let small imperfections slide.",
    "Apply an ordinary household standard: report visible clutter that a quick tidy-up would fix.",
    "Be fairly strict: flag small items out of place, not just big mess.",
    "Be very strict: flag every minor issue you can see, even a single item out of place.",
];

/// Build the inspection prompt for one zone.
///
/// `pickiness` outside 1-5 is clamped; config validation rejects such
/// zones before they get here.
pub fn build_prompt(zone: &ZoneConfig) -> String {
    let strictness = STRICTNESS[usize::from(zone.pickiness.clamp(1, 5)) - 1];

    format!(
        "You are {personality} for a smart home.\n\
         The attached image shows the room called: '{name}'.\n\
         \n\
         Your job:\n\
         1. Decide whether this room needs tidying RIGHT NOW.\n\
         2. If it does, produce a SHORT checklist of specific tasks, most important first.\n\
         3. If nothing useful needs doing, mark the room as tidy.\n\
         \n\
         Strictness: {strictness}\n\
         \n\
         Rules:\n\
         - Only describe visible tidying work (clear surfaces, put things away, obvious rubbish).\n\
         - Do NOT invent tasks for things you cannot see.\n\
         - Keep each task short and actionable.\n\
         - Respond with ONLY a JSON object of this exact shape:\n\
         {{\n\
           \"status\": \"tidy\" | \"messy\",\n\
           \"tasks\": [\"short task\", ...],\n\
           \"comment\": \"optional one-line summary\"\n\
         }}\n\
         - If there is nothing to do, use status \"tidy\" and an empty tasks list.\n\
         - A \"messy\" status must come with at least one task.",
        personality = zone.personality,
        name = zone.name,
    )
}
