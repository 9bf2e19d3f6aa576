//! Prompt templates for the annotation passes

/// Template for annotating one batch of consecutive turns
pub const ANNOTATE_BATCH_TEMPLATE: &str = r#"
You are an AI assistant that annotates citizen interview transcripts for
social research. Your task is to tag each conversational turn in the batch
below along four dimensions and rate your confidence.

<TAG DIMENSIONS>
functional_tags: what the utterance does (question, answer, proposal, complaint, clarification, digression)
content_tags: civic topics the utterance is about (housing, transit, safety, green_space, services, community, cost_of_living)
evidence_tags: kind of evidence offered (personal_experience, hearsay, observation, data, none)
emotional_tags: emotional register (neutral, frustrated, hopeful, worried, proud, resigned)
</TAG DIMENSIONS>

<INTERVIEW {{interview_id}} - BATCH {{batch_index}}>
{{#each turns}}
[turn {{index}}] {{speaker}}: {{{text}}}
{{/each}}
</INTERVIEW {{interview_id}} - BATCH {{batch_index}}>

Instructions:
1. Annotate every turn in the batch, and only turns in the batch
2. Use the turn numbers exactly as given in [turn N]
3. Choose tags from the dimensions above; multiple tags per dimension are allowed, empty lists are allowed
4. Set confidence between 0.0 and 1.0 for each turn

Return a JSON object with the following structure:
{
  "turn_annotations": [
    {
      "turn_index": 0,
      "functional_tags": ["question"],
      "content_tags": ["transit"],
      "evidence_tags": [],
      "emotional_tags": ["neutral"],
      "confidence": 0.9
    }
  ]
}
"#;

/// Template for the interview-level synthesis pass
pub const SYNTHESIZE_INTERVIEW_TEMPLATE: &str = r#"
You are an AI assistant that synthesizes citizen interview transcripts for
social research. Read the whole interview and produce an interview-level
summary of what this citizen cares about.

<INTERVIEW {{interview_id}}>
{{{transcript}}}
</INTERVIEW {{interview_id}}>

Instructions:
1. List the participant's priorities, most salient first
2. Note narrative features of the interview as a whole (e.g. story-driven, comparative, past-focused)
3. Sketch a short participant profile in one or two sentences
4. Base everything strictly on the transcript; do not invent biography

Return a JSON object with the following structure:
{
  "priorities": ["safe cycling routes", "affordable housing"],
  "narrative_features": ["story-driven", "past-focused"],
  "participant_profile": "Long-time resident who frames concerns through her children's daily routines."
}
"#;
