// ============================================================================
// Chart Glance - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod analysis;  // Panneau d'analyse IA (requête en cours, résultat)
pub mod api;       // Clients externes : TradingView, Gemini
pub mod app;       // État de l'application
pub mod config;    // Configuration par variables d'environnement
pub mod export;    // Export texte / JSON des analyses
pub mod models;    // Structures de données
pub mod selection; // Sélection (ticker, intervalle) et récents
pub mod store;     // Persistance des préférences
pub mod ui;        // Interface utilisateur
pub mod widget;    // Cycle de vie du widget de graphique
