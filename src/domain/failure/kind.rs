use serde::{Deserialize, Serialize};

/// Language used for user-facing failure messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "es" | "es-es" | "es-mx" => Ok(Locale::Es),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}

/// Failure taxonomy every fault is mapped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigurationError,
    AuthError,
    RateLimitError,
    TransientServerError,
    TimeoutError,
    MalformedResponseError,
    StorageError,
    UnknownError,
}

impl ErrorKind {
    /// Retryability of the kind itself. Timeouts and storage faults can still
    /// turn fatal depending on the fault details, see `ErrorClassifier`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConfigurationError | Self::AuthError | Self::UnknownError => false,
            Self::RateLimitError
            | Self::TransientServerError
            | Self::TimeoutError
            | Self::MalformedResponseError
            | Self::StorageError => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::AuthError => "AuthError",
            Self::RateLimitError => "RateLimitError",
            Self::TransientServerError => "TransientServerError",
            Self::TimeoutError => "TimeoutError",
            Self::MalformedResponseError => "MalformedResponseError",
            Self::StorageError => "StorageError",
            Self::UnknownError => "UnknownError",
        }
    }

    pub fn user_message(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => match self {
                Self::ConfigurationError => {
                    "The API key or generation settings are invalid. Check your settings."
                }
                Self::AuthError => "The API key was rejected. Please update it in the settings.",
                Self::RateLimitError => {
                    "Too many requests right now. Please wait a few seconds and try again."
                }
                Self::TransientServerError => {
                    "The generation service is having trouble. Please try again shortly."
                }
                Self::TimeoutError => "The request took too long to complete. Please try again.",
                Self::MalformedResponseError => {
                    "The generation service returned an empty reply. Please try again."
                }
                Self::StorageError => "Local storage could not be used for caching.",
                Self::UnknownError => "Something went wrong while generating a reply.",
            },
            Locale::Es => match self {
                Self::ConfigurationError => {
                    "La clave de API o la configuración no son válidas. Revisa los ajustes."
                }
                Self::AuthError => "La clave de API fue rechazada. Actualízala en los ajustes.",
                Self::RateLimitError => {
                    "Demasiadas solicitudes. Espera unos segundos y vuelve a intentarlo."
                }
                Self::TransientServerError => {
                    "El servicio de generación tiene problemas. Inténtalo de nuevo en breve."
                }
                Self::TimeoutError => "La solicitud tardó demasiado. Inténtalo de nuevo.",
                Self::MalformedResponseError => {
                    "El servicio devolvió una respuesta vacía. Inténtalo de nuevo."
                }
                Self::StorageError => "No se pudo usar el almacenamiento local para la caché.",
                Self::UnknownError => "Algo salió mal al generar la respuesta.",
            },
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
