//! Voice selection: narrator and dialogue defaults plus a stable
//! speaker-to-voice mapping.
//!
//! The catalog and default voices outlive a document. The speaker mapping
//! ([`VoiceAssignment`]) belongs to the document session and is dropped with it.

use crate::document::Chunk;
use crate::error::{ReaderError, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One voice as reported by the synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    /// BCP-47 style tag, e.g. `en-US`.
    pub language: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }

    /// A hint matches a whole word of the name, so `alex` does not pick
    /// `Alexandra`.
    fn name_matches_any(&self, hints: &[String]) -> bool {
        let name = self.name.to_lowercase();
        let words: Vec<&str> = name
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        hints.iter().any(|hint| {
            let hint = hint.to_lowercase();
            words.iter().any(|word| *word == hint)
        })
    }
}

/// Speaker name (case-sensitive, as extracted) to voice id.
///
/// Entries are only ever added; the whole map goes away with its session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceAssignment {
    by_speaker: BTreeMap<String, String>,
}

impl VoiceAssignment {
    pub fn get(&self, speaker: &str) -> Option<&str> {
        self.by_speaker.get(speaker).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_speaker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_speaker.is_empty()
    }

    fn uses_voice(&self, voice_id: &str) -> bool {
        self.by_speaker.values().any(|assigned| assigned == voice_id)
    }

    fn insert(&mut self, speaker: &str, voice_id: &str) {
        self.by_speaker
            .insert(speaker.to_string(), voice_id.to_string());
    }
}

/// Language prefix and name hints used for default voice selection.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicePreferences {
    pub language: String,
    pub male_hints: Vec<String>,
    pub female_hints: Vec<String>,
    pub dialogue_pitch: f32,
    pub narration_pitch: f32,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        Self {
            language: crate::config::defaults::default_voice_language(),
            male_hints: crate::config::defaults::default_male_hints(),
            female_hints: crate::config::defaults::default_female_hints(),
            dialogue_pitch: crate::config::defaults::default_dialogue_pitch(),
            narration_pitch: crate::config::defaults::default_narration_pitch(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoiceAssigner {
    prefs: VoicePreferences,
    catalog: Vec<Voice>,
    primary: Vec<String>,
    narrator: Option<String>,
    dialogue: Option<String>,
    chosen_narrator: Option<String>,
    chosen_dialogue: Option<String>,
    smart_voices: bool,
}

impl VoiceAssigner {
    pub fn new(prefs: VoicePreferences, smart_voices: bool) -> Self {
        Self {
            prefs,
            catalog: Vec::new(),
            primary: Vec::new(),
            narrator: None,
            dialogue: None,
            chosen_narrator: None,
            chosen_dialogue: None,
            smart_voices,
        }
    }

    /// Install a new catalog and re-run default selection. An explicit
    /// narrator or dialogue choice survives if the voice is still offered.
    pub fn reload_catalog(&mut self, voices: Vec<Voice>) {
        let language = self.prefs.language.to_lowercase();
        let primary: Vec<&Voice> = voices
            .iter()
            .filter(|voice| voice.language.to_lowercase().starts_with(&language))
            .collect();
        // No voice in the configured language: treat the whole catalog as primary.
        let primary = if primary.is_empty() {
            voices.iter().collect()
        } else {
            primary
        };

        let mut narrator = primary.first().map(|voice| voice.id.clone());
        if let Some(male) = primary
            .iter()
            .find(|voice| voice.name_matches_any(&self.prefs.male_hints))
        {
            narrator = Some(male.id.clone());
        }

        let mut dialogue = primary
            .get(1)
            .map(|voice| voice.id.clone())
            .or_else(|| narrator.clone());
        if let Some(female) = primary.iter().find(|voice| {
            voice.name_matches_any(&self.prefs.female_hints)
                && Some(voice.id.as_str()) != narrator.as_deref()
        }) {
            dialogue = Some(female.id.clone());
        }

        self.primary = primary.iter().map(|voice| voice.id.clone()).collect();
        self.catalog = voices;

        self.chosen_narrator = self.chosen_narrator.take().filter(|id| self.has_voice(id));
        self.chosen_dialogue = self.chosen_dialogue.take().filter(|id| self.has_voice(id));
        self.narrator = self.chosen_narrator.clone().or(narrator);
        self.dialogue = self.chosen_dialogue.clone().or(dialogue);

        info!(
            voices = self.catalog.len(),
            primary = self.primary.len(),
            narrator = self.narrator.as_deref().unwrap_or("<none>"),
            dialogue = self.dialogue.as_deref().unwrap_or("<none>"),
            "Voice catalog loaded"
        );
    }

    pub fn catalog(&self) -> &[Voice] {
        &self.catalog
    }

    pub fn narrator_voice(&self) -> Option<&str> {
        self.narrator.as_deref()
    }

    pub fn dialogue_voice(&self) -> Option<&str> {
        self.dialogue.as_deref()
    }

    pub fn smart_voices(&self) -> bool {
        self.smart_voices
    }

    pub fn set_smart_voices(&mut self, enabled: bool) {
        self.smart_voices = enabled;
    }

    pub fn set_narrator_voice(&mut self, voice_id: &str) -> Result<()> {
        if !self.has_voice(voice_id) {
            return Err(ReaderError::UnknownVoice(voice_id.to_string()));
        }
        self.chosen_narrator = Some(voice_id.to_string());
        self.narrator = Some(voice_id.to_string());
        Ok(())
    }

    pub fn set_dialogue_voice(&mut self, voice_id: &str) -> Result<()> {
        if !self.has_voice(voice_id) {
            return Err(ReaderError::UnknownVoice(voice_id.to_string()));
        }
        self.chosen_dialogue = Some(voice_id.to_string());
        self.dialogue = Some(voice_id.to_string());
        Ok(())
    }

    fn has_voice(&self, voice_id: &str) -> bool {
        self.catalog.iter().any(|voice| voice.id == voice_id)
    }

    /// Voice for a chunk. Narration always gets the narrator; unattributed
    /// dialogue gets the dialogue default; an attributed speaker gets a voice
    /// that stays fixed for the rest of the session.
    pub fn resolve(&self, chunk: &Chunk, assignments: &mut VoiceAssignment) -> Option<String> {
        if !self.smart_voices || !chunk.is_dialogue {
            return self.narrator.clone();
        }
        let Some(speaker) = chunk.speaker.as_deref() else {
            return self.dialogue.clone();
        };
        if let Some(voice_id) = assignments.get(speaker) {
            return Some(voice_id.to_string());
        }

        let narrator = self.narrator.as_deref();
        let unused = self
            .primary
            .iter()
            .find(|id| !assignments.uses_voice(id) && Some(id.as_str()) != narrator);
        let picked = match unused {
            Some(id) => id.clone(),
            None if self.primary.is_empty() => return self.narrator.clone(),
            None => self.primary[assignments.len() % self.primary.len()].clone(),
        };

        debug!(speaker, voice = %picked, "Assigned voice to new speaker");
        assignments.insert(speaker, &picked);
        Some(picked)
    }

    pub fn pitch_for(&self, chunk: &Chunk) -> f32 {
        if chunk.is_dialogue {
            self.prefs.dialogue_pitch
        } else {
            self.prefs.narration_pitch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Voice> {
        vec![
            Voice::new("en-1", "Alice", "en-US"),
            Voice::new("en-2", "Daniel", "en-GB"),
            Voice::new("en-3", "Samantha", "en-US"),
            Voice::new("en-4", "Rocko", "en-AU"),
            Voice::new("de-1", "Anna", "de-DE"),
        ]
    }

    fn assigner() -> VoiceAssigner {
        let mut assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        assigner.reload_catalog(catalog());
        assigner
    }

    fn dialogue(speaker: Option<&str>) -> Chunk {
        Chunk {
            page: 1,
            text: "\"Hi.\"".to_string(),
            is_dialogue: true,
            speaker: speaker.map(str::to_string),
        }
    }

    fn narration() -> Chunk {
        Chunk {
            page: 1,
            text: "It rained.".to_string(),
            is_dialogue: false,
            speaker: None,
        }
    }

    #[test]
    fn defaults_follow_name_hints() {
        let assigner = assigner();
        assert_eq!(assigner.narrator_voice(), Some("en-2"));
        assert_eq!(assigner.dialogue_voice(), Some("en-3"));
    }

    #[test]
    fn defaults_without_hints_use_first_two_primary_voices() {
        let mut assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        assigner.reload_catalog(vec![
            Voice::new("a", "Voice A", "en-US"),
            Voice::new("b", "Voice B", "en-US"),
        ]);
        assert_eq!(assigner.narrator_voice(), Some("a"));
        assert_eq!(assigner.dialogue_voice(), Some("b"));
    }

    #[test]
    fn female_hint_on_narrator_falls_back_to_second_voice() {
        let mut assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        assigner.reload_catalog(vec![
            Voice::new("a", "Daniel Kate", "en-US"),
            Voice::new("b", "Voice B", "en-US"),
        ]);
        assert_eq!(assigner.narrator_voice(), Some("a"));
        assert_eq!(assigner.dialogue_voice(), Some("b"));
    }

    #[test]
    fn hints_match_whole_words_only() {
        let mut assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        assigner.reload_catalog(vec![
            Voice::new("x", "Alexandra", "en-US"),
            Voice::new("f", "Frederica", "en-US"),
            Voice::new("g", "en-US Guy (Neural)", "en-US"),
        ]);
        assert_eq!(assigner.narrator_voice(), Some("g"));
        assert_eq!(assigner.dialogue_voice(), Some("f"));
    }

    #[test]
    fn single_voice_serves_both_roles() {
        let mut assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        assigner.reload_catalog(vec![Voice::new("only", "Voice", "en-US")]);
        assert_eq!(assigner.narrator_voice(), Some("only"));
        assert_eq!(assigner.dialogue_voice(), Some("only"));
    }

    #[test]
    fn narration_and_unattributed_dialogue_use_defaults() {
        let assigner = assigner();
        let mut map = VoiceAssignment::default();
        assert_eq!(assigner.resolve(&narration(), &mut map).as_deref(), Some("en-2"));
        assert_eq!(assigner.resolve(&dialogue(None), &mut map).as_deref(), Some("en-3"));
        assert!(map.is_empty());
    }

    #[test]
    fn smart_voices_off_always_uses_narrator() {
        let mut assigner = assigner();
        assigner.set_smart_voices(false);
        let mut map = VoiceAssignment::default();
        assert_eq!(
            assigner.resolve(&dialogue(Some("Ana")), &mut map).as_deref(),
            Some("en-2")
        );
        assert!(map.is_empty());
    }

    #[test]
    fn new_speakers_get_unused_primary_voices_then_round_robin() {
        let assigner = assigner();
        let mut map = VoiceAssignment::default();
        let ana = assigner.resolve(&dialogue(Some("Ana")), &mut map);
        let ben = assigner.resolve(&dialogue(Some("Ben")), &mut map);
        let cid = assigner.resolve(&dialogue(Some("Cid")), &mut map);
        assert_eq!(ana.as_deref(), Some("en-1"));
        assert_eq!(ben.as_deref(), Some("en-3"));
        assert_eq!(cid.as_deref(), Some("en-4"));

        // Every non-narrator primary voice is taken; 3 % 4 == 3.
        let dan = assigner.resolve(&dialogue(Some("Dan")), &mut map);
        assert_eq!(dan.as_deref(), Some("en-4"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn speaker_voice_is_stable() {
        let assigner = assigner();
        let mut map = VoiceAssignment::default();
        let first = assigner.resolve(&dialogue(Some("Ana")), &mut map);
        for _ in 0..5 {
            assigner.resolve(&dialogue(Some("Other")), &mut map);
            assert_eq!(assigner.resolve(&dialogue(Some("Ana")), &mut map), first);
        }
    }

    #[test]
    fn speaker_names_are_case_sensitive() {
        let assigner = assigner();
        let mut map = VoiceAssignment::default();
        let upper = assigner.resolve(&dialogue(Some("Ana")), &mut map);
        let lower = assigner.resolve(&dialogue(Some("ANA")), &mut map);
        assert_ne!(upper, lower);
    }

    #[test]
    fn explicit_choice_survives_catalog_reload() {
        let mut assigner = assigner();
        assigner.set_narrator_voice("en-4").unwrap();
        assigner.reload_catalog(catalog());
        assert_eq!(assigner.narrator_voice(), Some("en-4"));

        assigner.reload_catalog(vec![Voice::new("en-9", "Voice", "en-US")]);
        assert_eq!(assigner.narrator_voice(), Some("en-9"));
    }

    #[test]
    fn unknown_voice_is_rejected() {
        let mut assigner = assigner();
        let err = assigner.set_dialogue_voice("nope").unwrap_err();
        assert!(matches!(err, ReaderError::UnknownVoice(id) if id == "nope"));
    }

    #[test]
    fn falls_back_to_whole_catalog_when_language_missing() {
        let mut assigner = VoiceAssigner::new(
            VoicePreferences {
                language: "fr".to_string(),
                ..VoicePreferences::default()
            },
            true,
        );
        assigner.reload_catalog(vec![Voice::new("de-1", "Anna", "de-DE")]);
        assert_eq!(assigner.narrator_voice(), Some("de-1"));
    }

    #[test]
    fn empty_catalog_resolves_to_backend_default() {
        let assigner = VoiceAssigner::new(VoicePreferences::default(), true);
        let mut map = VoiceAssignment::default();
        assert_eq!(assigner.resolve(&dialogue(Some("Ana")), &mut map), None);
        assert!(map.is_empty());
    }

    #[test]
    fn dialogue_gets_raised_pitch() {
        let assigner = assigner();
        assert!(assigner.pitch_for(&dialogue(None)) > assigner.pitch_for(&narration()));
    }
}
