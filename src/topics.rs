//! Static topic catalog for the description exercise.
//!
//! Each [`Topic`] is an immutable catalog entry: a stable id, a display
//! title, a one-line description, a symbol for the topic grid, and an
//! ordered list of suggested vocabulary the learner is encouraged to use.
//! The catalog is baked into the binary and never mutated at runtime; the
//! session holds `&'static Topic` references into it.

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// One entry of the practice-topic catalog.
#[derive(Debug)]
pub struct Topic {
    /// Stable identifier used by the shell's `SelectTopic` intent.
    pub id: &'static str,
    /// Display title — also the subject handed to the image service.
    pub title: &'static str,
    /// One-line description shown on the topic card.
    pub description: &'static str,
    /// Symbol rendered next to the title in the topic grid.
    pub symbol: &'static str,
    /// Ordered suggested vocabulary for this topic.
    pub vocabulary: &'static [&'static str],
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The built-in catalog, in display order.
pub const CATALOG: &[Topic] = &[
    Topic {
        id: "ciudad",
        title: "La Ciudad",
        description: "Describe una escena urbana: edificios, calles y gente.",
        symbol: "🏙",
        vocabulary: &[
            "el rascacielos",
            "la acera",
            "el semáforo",
            "el tráfico",
            "la multitud",
            "el barrio",
        ],
    },
    Topic {
        id: "tecnologia",
        title: "Tecnología",
        description: "Describe aparatos, pantallas y cómo se usan.",
        symbol: "💻",
        vocabulary: &[
            "la pantalla",
            "el teclado",
            "el dispositivo",
            "la aplicación",
            "conectar",
            "la red",
        ],
    },
    Topic {
        id: "naturaleza",
        title: "La Naturaleza",
        description: "Describe un paisaje: montañas, ríos, plantas y animales.",
        symbol: "🌲",
        vocabulary: &[
            "el paisaje",
            "la montaña",
            "el bosque",
            "el arroyo",
            "florecer",
            "salvaje",
        ],
    },
    Topic {
        id: "comida",
        title: "La Comida",
        description: "Describe platos, ingredientes y una mesa servida.",
        symbol: "🥘",
        vocabulary: &[
            "el plato",
            "la receta",
            "sabroso",
            "picante",
            "los ingredientes",
            "la sobremesa",
        ],
    },
    Topic {
        id: "viajes",
        title: "Los Viajes",
        description: "Describe una escena de viaje: estaciones, equipaje, destinos.",
        symbol: "✈",
        vocabulary: &[
            "el equipaje",
            "el destino",
            "el andén",
            "la maleta",
            "el extranjero",
            "hacer escala",
        ],
    },
    Topic {
        id: "vida-diaria",
        title: "La Vida Diaria",
        description: "Describe rutinas cotidianas: casa, trabajo, mercado.",
        symbol: "🏠",
        vocabulary: &[
            "la rutina",
            "madrugar",
            "las tareas",
            "el mercado",
            "cotidiano",
            "el quehacer",
        ],
    },
];

/// Look a topic up by its stable id.
pub fn find(id: &str) -> Option<&'static Topic> {
    CATALOG.iter().find(|t| t.id == id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
