//! Default catalog of exercises and workout templates.
//!
//! The catalog is static: built once at startup and read-only afterwards.
//! Building it also precomputes the slot index used to attribute historical
//! logs to exercises without rescanning every template.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// What a slot id resolves to, across every template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    pub template_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
}

/// The complete catalog of exercises and templates
#[derive(Clone, Debug)]
pub struct Catalog {
    exercises: HashMap<String, ExerciseDefinition>,
    templates: Vec<WorkoutTemplate>,
    slot_index: HashMap<String, SlotInfo>,
}

impl Catalog {
    /// Build a catalog and its slot index.
    ///
    /// Slots referencing unknown exercises are left out of the index; use
    /// [`Catalog::validate`] to surface them.
    pub fn new(exercises: Vec<ExerciseDefinition>, templates: Vec<WorkoutTemplate>) -> Self {
        let exercises: HashMap<String, ExerciseDefinition> = exercises
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        let mut slot_index = HashMap::new();
        for template in &templates {
            for slot in &template.slots {
                let Some(exercise) = exercises.get(&slot.exercise_id) else {
                    continue;
                };
                slot_index.entry(slot.id.clone()).or_insert_with(|| SlotInfo {
                    template_id: template.id.clone(),
                    exercise_id: exercise.id.clone(),
                    exercise_name: exercise.name.clone(),
                });
            }
        }

        Self {
            exercises,
            templates,
            slot_index,
        }
    }

    pub fn exercise(&self, id: &str) -> Option<&ExerciseDefinition> {
        self.exercises.get(id)
    }

    pub fn exercises(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.exercises.values()
    }

    /// Templates in display order
    pub fn templates(&self) -> &[WorkoutTemplate] {
        &self.templates
    }

    pub fn template(&self, id: &str) -> Option<&WorkoutTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Resolve a slot id from any template
    pub fn slot_info(&self, slot_id: &str) -> Option<&SlotInfo> {
        self.slot_index.get(slot_id)
    }

    /// Exercise performed in `slot`
    pub fn exercise_for_slot(&self, slot: &RoutineExerciseSlot) -> Option<&ExerciseDefinition> {
        self.exercises.get(&slot.exercise_id)
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.default_rest_seconds == 0 {
                errors.push(format!("Exercise '{}' has zero rest duration", id));
            }
        }

        if self.templates.is_empty() {
            errors.push("Catalog has no templates".to_string());
        }

        let mut template_ids = HashSet::new();
        let mut all_slot_ids = HashSet::new();
        for template in &self.templates {
            if template.id.is_empty() {
                errors.push("Template has empty ID".to_string());
            }
            if !template_ids.insert(template.id.as_str()) {
                errors.push(format!("Duplicate template ID '{}'", template.id));
            }
            if template.slots.is_empty() {
                errors.push(format!("Template '{}' has no slots", template.id));
            }

            let mut slot_ids = HashSet::new();
            for slot in &template.slots {
                if !slot_ids.insert(slot.id.as_str()) {
                    errors.push(format!(
                        "Template '{}' has duplicate slot ID '{}'",
                        template.id, slot.id
                    ));
                } else if !all_slot_ids.insert(slot.id.as_str()) {
                    // History is keyed by slot id alone
                    errors.push(format!(
                        "Slot ID '{}' in template '{}' is already used by another template",
                        slot.id, template.id
                    ));
                }
                if !self.exercises.contains_key(&slot.exercise_id) {
                    errors.push(format!(
                        "Template '{}' slot '{}' references non-existent exercise '{}'",
                        template.id, slot.id, slot.exercise_id
                    ));
                }
            }
        }

        errors
    }
}

fn exercise(id: &str, name: &str, muscle_group: &str, rest: u32) -> ExerciseDefinition {
    ExerciseDefinition {
        id: id.into(),
        name: name.into(),
        muscle_group: muscle_group.into(),
        default_rest_seconds: rest,
    }
}

fn template(id: &str, name: &str, slots: &[(&str, &str)]) -> WorkoutTemplate {
    WorkoutTemplate {
        id: id.into(),
        name: name.into(),
        slots: slots
            .iter()
            .zip(1..)
            .map(|((slot_id, exercise_id), order)| RoutineExerciseSlot {
                id: (*slot_id).into(),
                exercise_id: (*exercise_id).into(),
                order,
            })
            .collect(),
    }
}

/// Builds the default catalog: the four-day machine split
///
/// **Note**: prefer `get_default_catalog()` which returns a cached reference.
pub fn build_default_catalog() -> Catalog {
    let exercises = vec![
        exercise("abdos_maquina", "Abdos (Máquina)", "Abdos", 60),
        exercise("press_pecho_plano_maquina", "Press Pecho Plano (Máquina)", "Pecho", 150),
        exercise("apertura_inclinada_maquina", "Apertura Inclinada (Máquina)", "Pecho", 150),
        exercise("press_hombro_inclinado_maquina", "Press Hombro (Máquina Inclinada)", "Hombro", 150),
        exercise("elevacion_lateral_maquina", "Elevación Lateral (Máquina)", "Hombro", 150),
        exercise("ext_triceps_polea_1_brazo_d", "Ext. Tríceps Polea (1 Brazo) - Derecho", "Tríceps", 150),
        exercise("ext_triceps_polea_1_brazo_i", "Ext. Tríceps Polea (1 Brazo) - Izquierdo", "Tríceps", 150),
        exercise("fondos_sentado_maquina", "Fondos Sentado (Máquina)", "Tríceps", 150),
        exercise("jalon_pecho_neutro", "Jalón al Pecho (Agarre Neutro)", "Espalda", 150),
        exercise("remo_sentado_maquina", "Remo Sentado (Máquina)", "Espalda", 150),
        exercise("curl_biceps_polea_recta", "Curl Bíceps Polea (Barra Recta)", "Bíceps", 150),
        exercise("curl_martillo_polea", "Curl Martillo (Polea/Cuerda)", "Bíceps", 150),
        exercise("curl_muneca_polea_recta", "Curl Muñeca Polea (Barra Recta)", "Antebrazo", 90),
        exercise("curl_muneca_inverso_polea", "Curl Muñeca Inverso Polea (Barra)", "Antebrazo", 90),
        exercise("encogimientos_mancuernas", "Encogimientos (Mancuernas, de pie)", "Trapecio", 60),
        exercise("press_pecho_inclinado_maquina", "Press de Pecho Inclinado (Máquina)", "Pecho", 150),
        exercise("aperturas_mancuernas_hombro", "Aperturas con Mancuernas (hombro)", "Hombro", 150),
        exercise("press_hombro_maquina", "Press de Hombro (Máquina)", "Hombro", 150),
        exercise("ext_triceps_polea_curvo", "Ext. Tríceps Polea (Agarre Curvo)", "Tríceps", 150),
        exercise("ext_triceps_polea_recta", "Ext. Tríceps Polea (Barra Recta)", "Tríceps", 150),
        exercise("jalon_pecho_maquina_espalda", "Jalón al Pecho (Máquina - Espalda)", "Espalda", 150),
        exercise("remo_sentado_maquina_espalda", "Remo Sentado (Máquina - Espalda)", "Espalda", 150),
        exercise("curl_biceps_inclinado_manc", "Curl de Bíceps Inclinado (Manc.)", "Bíceps", 150),
        exercise("curl_martillo_mancuerna", "Curl Martillo (Mancuerna)", "Bíceps", 150),
        exercise("curl_muneca_mancuerna_d", "Curl de Muñeca (Mancuerna) - Derecho", "Antebrazo", 90),
        exercise("curl_muneca_mancuerna_i", "Curl de Muñeca (Mancuerna) - Izquierdo", "Antebrazo", 90),
        exercise("encogimientos_manc_trapecio_d", "Encogimientos (Manc. - Trapecio) - Derecho", "Trapecio", 60),
        exercise("encogimientos_manc_trapecio_i", "Encogimientos (Manc. - Trapecio) - Izquierdo", "Trapecio", 60),
        exercise("encogimientos_sentado_manc", "Encogimientos Sentado (Manc.)", "Trapecio", 60),
    ];

    let templates = vec![
        template(
            "dia_1",
            "Día 1: Abdos, Pecho, Hombro, Tríceps",
            &[
                ("d1_e1", "abdos_maquina"),
                ("d1_e2", "press_pecho_plano_maquina"),
                ("d1_e3", "apertura_inclinada_maquina"),
                ("d1_e4", "press_hombro_inclinado_maquina"),
                ("d1_e5", "elevacion_lateral_maquina"),
                ("d1_e6_d", "ext_triceps_polea_1_brazo_d"),
                ("d1_e6_i", "ext_triceps_polea_1_brazo_i"),
                ("d1_e7", "fondos_sentado_maquina"),
            ],
        ),
        template(
            "dia_2",
            "Día 2: Abdos, Espalda, Bíceps, Antebrazo, Trapecio",
            &[
                ("d2_e1", "abdos_maquina"),
                ("d2_e2", "jalon_pecho_neutro"),
                ("d2_e3", "remo_sentado_maquina"),
                ("d2_e4", "curl_biceps_polea_recta"),
                ("d2_e5", "curl_martillo_polea"),
                ("d2_e6", "curl_muneca_polea_recta"),
                ("d2_e7", "curl_muneca_inverso_polea"),
                ("d2_e8", "encogimientos_mancuernas"),
            ],
        ),
        template(
            "dia_3",
            "Día 3: Abdos, Pecho, Hombro, Tríceps",
            &[
                ("d3_e1", "abdos_maquina"),
                ("d3_e2", "press_pecho_inclinado_maquina"),
                ("d3_e3", "press_pecho_plano_maquina"),
                ("d3_e4", "aperturas_mancuernas_hombro"),
                ("d3_e5", "press_hombro_maquina"),
                ("d3_e6", "ext_triceps_polea_curvo"),
                ("d3_e7", "ext_triceps_polea_recta"),
            ],
        ),
        template(
            "dia_4",
            "Día 4: Abdos, Espalda, Bíceps, Antebrazo, Trapecio",
            &[
                ("d4_e1", "abdos_maquina"),
                ("d4_e2", "jalon_pecho_maquina_espalda"),
                ("d4_e3", "remo_sentado_maquina_espalda"),
                ("d4_e4", "curl_biceps_inclinado_manc"),
                ("d4_e5", "curl_martillo_mancuerna"),
                ("d4_e6_d", "curl_muneca_mancuerna_d"),
                ("d4_e6_i", "curl_muneca_mancuerna_i"),
                ("d4_e7_d", "encogimientos_manc_trapecio_d"),
                ("d4_e7_i", "encogimientos_manc_trapecio_i"),
                ("d4_e8", "encogimientos_sentado_manc"),
            ],
        ),
    ];

    Catalog::new(exercises, templates)
}
