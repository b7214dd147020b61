use crate::profile::UserProfile;
use crate::types::{ItemDraft, Record, Status};
use serde_json::json;

/// Situation the outfit is chosen for
#[derive(Debug, Clone, Default)]
pub struct OotdContext {
    pub weather: String,
    pub occasion: String,
    pub mood: String,
}

/// Prompt asking the AI to analyse one photographed item
pub fn build_add_item_prompt(profile: &UserProfile, draft: &ItemDraft) -> String {
    let profile_json = profile.to_prompt_json();

    format!(
        r#"You are a professional personal stylist and wardrobe manager.
You will receive the wearer's measurements and style preferences (JSON) together
with a photo and basic details of one clothing item.

Analyse the item and reply with JSON in the exact format below so it can be
stored in the wardrobe database.

---
### 1. User profile
```json
{profile_json}
```

### 2. Item details
- Name: {name}
- Size: {size}
- Wearer's notes: {notes}
- (see the attached photo)

---
### 3. Your task
Describe the item's:
1. **Basics**: type and main color.
2. **Style tags**: 3-5 tags such as "soft", "sharp", "playful".
3. **Seasons**: spring, summer, autumn, winter.
4. **Occasions**: work, date, casual, formal, ...
5. **Length**: where the garment ends on a wearer {height}cm tall.
6. **Body effect**: how it flatters or works against this body shape ({body_notes}).
7. **Notes**: one sentence of styling advice.

---
### 4. Reply format (CRITICAL)
Reply with **a single JSON object only**, no introduction or closing text.

If **no photo was attached**, reply with:
```json
{{
  "ok": false,
  "message": "Please attach a photo of the item so I can analyse it.",
  "data": {{}}
}}
```

Otherwise reply with:
```json
{{
  "ok": true,
  "message": "a short note or encouragement for the user",
  "data": {{
    "type": "item type (e.g. coat, dress, shirt)",
    "color": "main color",
    "styleTags": ["tag1", "tag2"],
    "seasons": ["season1"],
    "occasions": ["occasion1"],
    "lengthDesc": "length description",
    "bodyEffect": "body effect analysis",
    "notes": "styling advice"
  }}
}}
```"#,
        name = draft.name,
        size = draft.size.as_deref().unwrap_or(""),
        notes = draft.notes.as_deref().unwrap_or(""),
        height = profile.height_cm,
        body_notes = profile.body_shape_notes,
    )
}

/// Prompt asking the AI to analyse many uploaded photos at once
pub fn build_batch_prompt(filenames: &[String], profile: &UserProfile) -> String {
    let profile_json = profile.to_prompt_json();
    let files = filenames
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a professional personal stylist.
I am uploading {count} photos of clothing items. Analyse all of them and reply
with one JSON array.

---
### 1. User profile
```json
{profile_json}
```

### 2. Photos to analyse
{files}

---
### 3. Reply format (CRITICAL)
Reply with **a single JSON array only**, no introduction.
Every object must have a `filename` field that **matches a name from the list
above exactly**.

**Double-check that each analysis belongs to the right file name.**

```json
[
  {{
    "filename": "photo file name (exactly as listed)",
    "data": {{
      "type": "item type",
      "color": "main color",
      "styleTags": ["tag1", "tag2"],
      "seasons": ["season"],
      "occasions": ["occasion"],
      "lengthDesc": "length description",
      "bodyEffect": "body effect",
      "notes": "styling advice"
    }}
  }}
]
```"#,
        count = filenames.len(),
    )
}

/// Prompt asking the AI to pick an outfit from the available items
pub fn build_ootd_prompt(profile: &UserProfile, records: &[Record], context: &OotdContext) -> String {
    let wardrobe: Vec<_> = records
        .iter()
        .filter(|r| r.status == Status::Available)
        .map(|r| {
            json!({
                "id": r.id,
                "name": r.name,
                "type": r.attributes.item_type,
                "color": r.attributes.color,
                "styleTags": r.attributes.style_tags,
                "seasons": r.attributes.seasons,
                "occasions": r.attributes.occasions,
            })
        })
        .collect();
    let wardrobe_json = serde_json::to_string_pretty(&wardrobe).unwrap_or_else(|_| "[]".to_string());
    let profile_json = profile.to_prompt_json();

    format!(
        r#"You are a top fashion consultant.
Using the wearer's profile, today's situation and their wardrobe, recommend
the best outfit of the day.

---
### 1. User profile
```json
{profile_json}
```

### 2. Today's situation
- Weather: {weather}
- Occasion: {occasion}
- Mood / goal: {mood}

### 3. Wardrobe
```json
{wardrobe_json}
```

---
### 4. Your task
Pick items from the wardrobe that make one outfit. Consider:
1. Whether it suits the weather.
2. Whether it fits the occasion.
3. Whether it flatters the wearer's body and matches today's mood.

---
### 5. Reply format (CRITICAL)
Reply with **a single JSON object only**:

```json
{{
  "ok": true,
  "message": "encouragement for the wearer",
  "outfits": [
    {{
      "title": "outfit theme",
      "reason": "why this works today (2-3 sentences)",
      "itemIds": ["id1", "id2"],
      "notes": "styling tips (e.g. roll up the sleeves, add silver earrings)"
    }}
  ]
}}
```"#,
        weather = context.weather,
        occasion = context.occasion,
        mood = context.mood,
    )
}
