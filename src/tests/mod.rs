// Cross-module tests driven through the facade
